//! Snapshot store keyed by query signature.
//!
//! No eviction: an entry lives until it is replaced by the next fetch for the
//! same key, invalidated, or the cache is cleared.

use std::collections::HashMap;

use storefront_primitives::product::{Product, ProductId};
use storefront_primitives::query::QuerySpec;
use storefront_primitives::stock::StockDelta;

#[derive(Debug)]
struct Entry {
    products: Vec<Product>,
    generation: u64,
}

#[derive(Debug, Default)]
pub struct LocalCache {
    entries: HashMap<QuerySpec, Entry>,
    generation: u64,
}

impl LocalCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &QuerySpec) -> Option<&[Product]> {
        self.entries.get(key).map(|entry| entry.products.as_slice())
    }

    /// First cached record of `id`, from any entry.
    #[must_use]
    pub fn get_product(&self, id: &ProductId) -> Option<&Product> {
        self.entries
            .values()
            .flat_map(|entry| entry.products.iter())
            .find(|product| product.id == *id)
    }

    /// Stores `snapshot` under `key`, replacing whatever was there, and
    /// returns the generation it was stored with.
    pub fn put(&mut self, key: QuerySpec, snapshot: Vec<Product>) -> u64 {
        self.generation = self.generation.wrapping_add(1);

        let _previous = self.entries.insert(
            key,
            Entry {
                products: snapshot,
                generation: self.generation,
            },
        );

        self.generation
    }

    /// Generation of the entry under `key`. It changes on every `put`, so a
    /// caller can tell whether someone else stored a fresher snapshot.
    #[must_use]
    pub fn generation(&self, key: &QuerySpec) -> Option<u64> {
        self.entries.get(key).map(|entry| entry.generation)
    }

    pub fn invalidate(&mut self, key: &QuerySpec) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replaces the stock count of every cached record of the delta's
    /// product and returns how many records matched.
    pub fn patch_stock(&mut self, delta: &StockDelta) -> usize {
        self.entries
            .values_mut()
            .flat_map(|entry| entry.products.iter_mut())
            .map(|product| product.apply_stock(delta))
            .filter(|matched| *matched)
            .count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
