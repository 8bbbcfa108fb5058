use core::num::NonZeroU32;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::null_as_default;
use crate::product::{Product, ProductId};

/// One line of the cart.
///
/// Display fields are captured when the product is added, so the cart keeps
/// rendering even after the product leaves every cached snapshot.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: NonZeroU32,
    pub price: Decimal,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
}

impl CartLine {
    #[must_use]
    pub fn from_product(product: &Product, quantity: NonZeroU32) -> Self {
        Self {
            product_id: product.id.clone(),
            quantity,
            price: product.price,
            name: product.name.clone(),
            image: product.primary_image().map(ToOwned::to_owned),
            category: product.category.clone(),
        }
    }

    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity.get()
    }

    #[must_use]
    pub fn total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity.get())
    }
}

/// What the backend answers on a successful checkout.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}
