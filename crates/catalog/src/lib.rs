//! Catalog side of the storefront engine.
//!
//! [`Catalog`] fetches raw snapshots through a
//! [`RemoteStore`](storefront_client::RemoteStore), keeps them in a
//! [`LocalCache`](cache::LocalCache) keyed by query, and hands out
//! [`CatalogView`]s that page through the filtered and sorted results. A
//! shared [`StockSynchronizer`](stock::StockSynchronizer) patches stock
//! counts in every cached snapshot and open view as the backend pushes them.

pub mod cache;
mod catalog;
pub mod config;
pub mod errors;
pub mod query;
pub mod stock;

#[cfg(test)]
mod tests;

pub use catalog::{Catalog, CatalogView};
pub use errors::CatalogError;
