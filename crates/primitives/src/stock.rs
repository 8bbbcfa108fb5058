use serde::{Deserialize, Serialize};

use crate::product::ProductId;

/// A stock update pushed by the backend.
///
/// Deltas carry the new absolute count, never an increment, so applying
/// one twice leaves the same state as applying it once.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockDelta {
    pub product_id: ProductId,
    #[serde(alias = "stock")]
    pub new_stock: u32,
}

impl StockDelta {
    #[must_use]
    pub fn new(product_id: impl Into<ProductId>, new_stock: u32) -> Self {
        Self {
            product_id: product_id.into(),
            new_stock,
        }
    }

    /// Parses the JSON payload of one stream message.
    pub fn parse(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}
