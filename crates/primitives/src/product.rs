use core::convert::Infallible;
use core::fmt;
use core::str::FromStr;
use std::borrow::Borrow;
use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::null_as_default;
use crate::stock::StockDelta;

/// Backend-assigned product identifier.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl Borrow<str> for ProductId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<ProductId> for String {
    fn from(id: ProductId) -> Self {
        id.0
    }
}

impl FromStr for ProductId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

/// A read-mostly replica of a backend product.
///
/// Only `stock` is ever mutated client-side, and only by stream patches.
/// It is `None` when the backend did not report a count.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id", alias = "id")]
    pub id: ProductId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    pub price: Decimal,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub num_reviews: u32,
    #[serde(
        rename = "countInStock",
        alias = "stock",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub stock: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,
    /// Single-image field used by older listing endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Product {
    #[must_use]
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            price,
            category: String::new(),
            tags: BTreeSet::new(),
            rating: 0.0,
            num_reviews: 0,
            stock: None,
            images: Vec::new(),
            image: None,
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    #[must_use]
    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = Some(stock);
        self
    }

    #[must_use]
    pub fn with_rating(mut self, rating: f32) -> Self {
        self.rating = rating.clamp(0.0, 5.0);
        self
    }

    #[must_use]
    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_images<I, T>(mut self, images: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.images = images.into_iter().map(Into::into).collect();
        self
    }

    /// The image shown on listing cards and captured into cart lines.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images
            .first()
            .map(String::as_str)
            .or(self.image.as_deref())
    }

    /// Whether at least one unit is known to be available. Unknown stock
    /// does not count.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        matches!(self.stock, Some(stock) if stock > 0)
    }

    /// Replaces the stock count if `delta` targets this product.
    ///
    /// Returns whether the delta matched, regardless of whether the value
    /// actually changed.
    pub fn apply_stock(&mut self, delta: &StockDelta) -> bool {
        if self.id != delta.product_id {
            return false;
        }

        self.stock = Some(delta.new_stock);
        true
    }
}
