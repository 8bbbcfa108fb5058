//! reqwest-backed [`RemoteStore`] speaking the storefront REST/SSE API.

use async_trait::async_trait;
use futures_util::StreamExt;
use storefront_primitives::cart::{CartLine, CheckoutReceipt};
use storefront_primitives::product::{Product, ProductId};
use tracing::debug;
use url::Url;

use crate::api::{CartAddRequest, CartQuantityRequest, CartRemoveRequest, CartResponse};
use crate::connection::ConnectionInfo;
use crate::errors::RemoteError;
use crate::sse::SseDecoder;
use crate::traits::{RemoteStore, StockStream};

#[derive(Clone, Debug)]
pub struct Client {
    connection: ConnectionInfo,
}

impl Client {
    #[must_use]
    pub const fn new(connection: ConnectionInfo) -> Self {
        Self { connection }
    }

    #[must_use]
    pub const fn api_url(&self) -> &Url {
        &self.connection.api_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        self.connection.endpoint(segments)
    }
}

#[async_trait]
impl RemoteStore for Client {
    async fn fetch_catalog(&self, category: Option<&str>) -> Result<Vec<Product>, RemoteError> {
        let url = match category {
            Some(category) => self.endpoint(&["api", "products", "category", category])?,
            None => self.endpoint(&["api", "products"])?,
        };

        self.connection.get(url).await
    }

    async fn search_catalog(&self, term: &str) -> Result<Vec<Product>, RemoteError> {
        let mut url = self.endpoint(&["api", "products", "search"])?;
        url.query_pairs_mut().append_pair("query", term);

        self.connection.get(url).await
    }

    async fn fetch_product(&self, id: &ProductId) -> Result<Product, RemoteError> {
        let url = self.endpoint(&["api", "products", id.as_str()])?;

        self.connection.get(url).await
    }

    async fn subscribe_stock_updates(&self) -> Result<StockStream, RemoteError> {
        let url = self.endpoint(&["api", "products", "stock-updates"])?;
        let response = self.connection.open_stream(url).await?;

        let stream = async_stream::stream! {
            let mut body = response.bytes_stream();
            let mut decoder = SseDecoder::new();

            while let Some(chunk) = body.next().await {
                match chunk {
                    Ok(chunk) => {
                        for event in decoder.feed(&chunk) {
                            yield Ok(event);
                        }
                    }
                    Err(err) => {
                        yield Err(RemoteError::from(err));
                        return;
                    }
                }
            }

            debug!("Stock stream body ended");
            yield Err(RemoteError::StreamClosed);
        };

        Ok(Box::pin(stream))
    }

    async fn cart_get(&self) -> Result<Vec<CartLine>, RemoteError> {
        let url = self.endpoint(&["api", "cart"])?;
        let response: CartResponse = self.connection.get(url).await?;

        Ok(response.items)
    }

    async fn cart_add(&self, request: &CartAddRequest) -> Result<(), RemoteError> {
        let url = self.endpoint(&["api", "cart", "add"])?;

        self.connection.post_ignored(url, Some(request)).await
    }

    async fn cart_set_quantity(&self, id: &ProductId, quantity: u32) -> Result<(), RemoteError> {
        let url = self.endpoint(&["api", "cart", "update"])?;
        let body = CartQuantityRequest {
            product_id: id,
            quantity,
        };

        self.connection.post_ignored(url, Some(&body)).await
    }

    async fn cart_remove(&self, id: &ProductId) -> Result<(), RemoteError> {
        let url = self.endpoint(&["api", "cart", "remove"])?;

        self.connection
            .post_ignored(url, Some(&CartRemoveRequest { product_id: id }))
            .await
    }

    async fn cart_clear(&self) -> Result<(), RemoteError> {
        let url = self.endpoint(&["api", "cart", "clear"])?;

        self.connection.post_ignored(url, None::<&()>).await
    }

    async fn cart_checkout(&self) -> Result<CheckoutReceipt, RemoteError> {
        let url = self.endpoint(&["api", "cart", "checkout"])?;

        self.connection.post_or_default(url, None::<&()>).await
    }
}
