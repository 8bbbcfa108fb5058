use storefront_client::RemoteError;
use storefront_primitives::product::ProductId;
use thiserror::Error;

use crate::CartNotice;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CartError {
    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(i64),

    #[error("only {available} more of {product_id} in stock, {requested} requested")]
    OutOfStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    #[error("{0} is not in the cart")]
    LineNotFound(ProductId),

    #[error("no removal to undo")]
    NothingToUndo,

    #[error("failed to sync cart with the server: {source}")]
    RemoteSyncFailed {
        product_id: Option<ProductId>,
        #[source]
        source: RemoteError,
    },

    #[error("failed to remove {product_id} from the cart: {source}")]
    RemoveFailed {
        product_id: ProductId,
        #[source]
        source: RemoteError,
    },

    #[error("checkout failed: {0}")]
    CheckoutFailed(#[source] RemoteError),

    #[error("cart operation did not complete")]
    Aborted,
}

impl CartError {
    /// Whether the operation was refused locally without touching the
    /// network or the cart.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidQuantity(_)
                | Self::OutOfStock { .. }
                | Self::LineNotFound(_)
                | Self::NothingToUndo
        )
    }

    /// The user-facing notice for failures that were rolled back.
    #[must_use]
    pub fn notice(&self) -> Option<CartNotice> {
        match self {
            Self::RemoteSyncFailed { product_id, source } => Some(CartNotice::SyncFailed {
                product_id: product_id.clone(),
                reason: source.to_string(),
            }),
            Self::RemoveFailed { product_id, source } => Some(CartNotice::RemoveFailed {
                product_id: product_id.clone(),
                reason: source.to_string(),
            }),
            Self::CheckoutFailed(source) => Some(CartNotice::CheckoutFailed {
                reason: source.to_string(),
            }),
            Self::InvalidQuantity(_)
            | Self::OutOfStock { .. }
            | Self::LineNotFound(_)
            | Self::NothingToUndo
            | Self::Aborted => None,
        }
    }
}
