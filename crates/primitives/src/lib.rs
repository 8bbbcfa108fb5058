//! Shared data model for the storefront sync engine.
//!
//! Everything here is a plain value type: products as the backend sends them,
//! the query signature used to filter and cache catalog pages, cart lines and
//! the stock deltas pushed over the live stream.

pub mod cart;
pub mod common;
pub mod product;
pub mod query;
pub mod stock;

#[cfg(test)]
mod tests;
