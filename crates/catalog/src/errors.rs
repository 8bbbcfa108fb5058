use storefront_client::RemoteError;
use storefront_primitives::product::ProductId;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("failed to fetch catalog snapshot: {0}")]
    FetchFailed(#[source] RemoteError),

    #[error("failed to fetch product {id}: {source}")]
    ProductUnavailable {
        id: ProductId,
        #[source]
        source: RemoteError,
    },
}
