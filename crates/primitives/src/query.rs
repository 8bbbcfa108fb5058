use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::product::Product;

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    None,
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
}

/// Price range filter.
///
/// Bounded ranges are half-open: `Between(10, 20)` admits `10` but not `20`,
/// so adjacent buckets never overlap.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "bounds")]
pub enum PriceBucket {
    #[default]
    Any,
    Under(Decimal),
    Between(Decimal, Decimal),
    Over(Decimal),
}

impl PriceBucket {
    #[must_use]
    pub fn contains(&self, price: Decimal) -> bool {
        match *self {
            Self::Any => true,
            Self::Under(max) => price < max,
            Self::Between(min, max) => min <= price && price < max,
            Self::Over(min) => price >= min,
        }
    }
}

/// Where a snapshot comes from on the backend.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FetchTarget<'a> {
    Category(Option<&'a str>),
    Search(&'a str),
}

/// The full signature of a catalog query.
///
/// Structural equality makes it usable directly as a cache key: two views
/// asking for the same filters share one snapshot.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
    #[serde(default)]
    pub price: PriceBucket,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<u8>,
    #[serde(default)]
    pub in_stock_only: bool,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
}

impl QuerySpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn sorted(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    #[must_use]
    pub const fn priced(mut self, price: PriceBucket) -> Self {
        self.price = price;
        self
    }

    #[must_use]
    pub fn rated_at_least(mut self, stars: u8) -> Self {
        self.min_rating = Some(stars.min(5));
        self
    }

    #[must_use]
    pub const fn in_stock_only(mut self) -> Self {
        self.in_stock_only = true;
        self
    }

    #[must_use]
    pub fn tagged<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// The backend call that produces the raw snapshot for this query.
    ///
    /// A search term takes precedence; the category is then applied as a
    /// local filter on the search results.
    #[must_use]
    pub fn fetch_target(&self) -> FetchTarget<'_> {
        match self.search.as_deref() {
            Some(term) => FetchTarget::Search(term),
            None => FetchTarget::Category(self.category.as_deref()),
        }
    }

    /// Whether `product` passes every filter of this query.
    ///
    /// Filters run in a fixed order (category, price, rating, stock, tags)
    /// and short-circuit on the first rejection.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = &self.category {
            if !product.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }

        if !self.price.contains(product.price) {
            return false;
        }

        if let Some(min) = self.min_rating {
            if rating_floor(product.rating) < min {
                return false;
            }
        }

        if self.in_stock_only && !product.in_stock() {
            return false;
        }

        self.tags.is_empty() || !self.tags.is_disjoint(&product.tags)
    }
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "rating is clamped to 0..=5 before the cast"
)]
fn rating_floor(rating: f32) -> u8 {
    if rating.is_nan() {
        return 0;
    }

    rating.clamp(0.0, 5.0).floor() as u8
}
