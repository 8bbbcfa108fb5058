use async_trait::async_trait;
use futures_util::stream::BoxStream;
use storefront_primitives::cart::{CartLine, CheckoutReceipt};
use storefront_primitives::product::{Product, ProductId};

use crate::api::CartAddRequest;
use crate::errors::RemoteError;
use crate::sse::SseEvent;

/// Raw stock stream. It ends, or yields an error, when the transport drops.
pub type StockStream = BoxStream<'static, Result<SseEvent, RemoteError>>;

/// Everything the engine needs from the storefront backend.
///
/// Implementations own transport concerns (timeouts, auth headers); every
/// failure is reported as a [`RemoteError`] and never retried here.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// Full snapshot of one category, or of the whole catalog.
    async fn fetch_catalog(&self, category: Option<&str>) -> Result<Vec<Product>, RemoteError>;

    async fn search_catalog(&self, term: &str) -> Result<Vec<Product>, RemoteError>;

    async fn fetch_product(&self, id: &ProductId) -> Result<Product, RemoteError>;

    /// Opens the server-push stock stream. No backlog is replayed.
    async fn subscribe_stock_updates(&self) -> Result<StockStream, RemoteError>;

    async fn cart_get(&self) -> Result<Vec<CartLine>, RemoteError>;

    /// Adds `request.quantity` units, creating the line when absent.
    async fn cart_add(&self, request: &CartAddRequest) -> Result<(), RemoteError>;

    async fn cart_set_quantity(&self, id: &ProductId, quantity: u32) -> Result<(), RemoteError>;

    async fn cart_remove(&self, id: &ProductId) -> Result<(), RemoteError>;

    async fn cart_clear(&self) -> Result<(), RemoteError>;

    async fn cart_checkout(&self) -> Result<CheckoutReceipt, RemoteError>;
}
