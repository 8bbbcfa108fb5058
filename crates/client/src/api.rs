//! Request and response bodies of the cart endpoints.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storefront_primitives::cart::CartLine;
use storefront_primitives::product::ProductId;

/// Body of `POST /api/cart/add`.
///
/// `quantity` is the increment, not the resulting line quantity. The display
/// fields let the backend create the line when it does not exist yet.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartAddRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub category: String,
}

impl CartAddRequest {
    #[must_use]
    pub fn new(line: &CartLine, quantity: u32) -> Self {
        Self {
            product_id: line.product_id.clone(),
            quantity,
            name: line.name.clone(),
            price: line.price,
            image: line.image.clone(),
            category: line.category.clone(),
        }
    }
}

/// Body of `POST /api/cart/update`.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartQuantityRequest<'a> {
    pub product_id: &'a ProductId,
    pub quantity: u32,
}

/// Body of `POST /api/cart/remove`.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartRemoveRequest<'a> {
    pub product_id: &'a ProductId,
}

/// Body of `GET /api/cart`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CartResponse {
    #[serde(default)]
    pub items: Vec<CartLine>,
}

/// Error body the backend attaches to rejected requests.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
