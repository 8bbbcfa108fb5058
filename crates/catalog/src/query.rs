//! Filtering, sorting and pagination over a raw snapshot.
//!
//! Everything here is a pure function of its inputs: the same snapshot and
//! query always produce the same ordering, so a window can be rebuilt at any
//! time and still be a prefix of what was shown before.

use core::cmp::Reverse;
use core::num::NonZeroUsize;

use storefront_primitives::product::Product;
use storefront_primitives::query::{QuerySpec, SortOrder};

use crate::config::DEFAULT_BATCH_SIZE;

/// A prefix of the filtered, sorted results.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Product>,
    /// Whether more results remain beyond `items`.
    pub has_more: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct QueryEngine {
    batch_size: NonZeroUsize,
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl QueryEngine {
    #[must_use]
    pub const fn new(batch_size: NonZeroUsize) -> Self {
        Self { batch_size }
    }

    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size.get()
    }

    /// Filters and sorts `snapshot`.
    ///
    /// Sorting is stable, so ties keep their snapshot order.
    #[must_use]
    pub fn select<'a>(&self, snapshot: &'a [Product], spec: &QuerySpec) -> Vec<&'a Product> {
        let mut selected: Vec<_> = snapshot.iter().filter(|p| spec.matches(p)).collect();

        match spec.sort {
            SortOrder::None => {}
            SortOrder::PriceAsc => selected.sort_by_key(|p| p.price),
            SortOrder::PriceDesc => selected.sort_by_key(|p| Reverse(p.price)),
            SortOrder::NameAsc => selected.sort_by_cached_key(|p| p.name.to_lowercase()),
            SortOrder::NameDesc => selected.sort_by_cached_key(|p| Reverse(p.name.to_lowercase())),
        }

        selected
    }

    /// Extends the `delivered` items already shown by one batch.
    ///
    /// The page holds everything up to the end of that batch, so once
    /// `delivered` reaches the result length it is the full result set.
    #[must_use]
    pub fn apply(&self, snapshot: &[Product], spec: &QuerySpec, delivered: usize) -> Page {
        self.window(snapshot, spec, delivered.saturating_add(self.batch_size()))
    }

    /// Rebuilds the first `len` results, e.g. after a stock patch.
    ///
    /// Only [`Self::apply`] moves the boundary past `len`.
    #[must_use]
    pub fn window(&self, snapshot: &[Product], spec: &QuerySpec, len: usize) -> Page {
        let selected = self.select(snapshot, spec);
        let end = len.min(selected.len());

        Page {
            items: selected[..end].iter().map(|&product| product.clone()).collect(),
            has_more: end < selected.len(),
        }
    }
}
