//! Cart side of the storefront engine.
//!
//! [`CartReconciler`] owns the local cart and keeps it in step with the
//! backend through optimistic edits that roll back on failure.

use storefront_primitives::product::ProductId;

pub mod config;
pub mod errors;
mod reconciler;

#[cfg(test)]
mod tests;

pub use errors::CartError;
pub use reconciler::{CartReconciler, PendingRemoval};

/// A failure that was rolled back, for the notification layer.
///
/// Published even when the view that started the operation is gone.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum CartNotice {
    SyncFailed {
        product_id: Option<ProductId>,
        reason: String,
    },
    RemoveFailed {
        product_id: ProductId,
        reason: String,
    },
    CheckoutFailed {
        reason: String,
    },
}
