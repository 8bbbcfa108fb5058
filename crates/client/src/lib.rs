//! Storefront backend client.
//!
//! The engine talks to the backend only through the [`RemoteStore`] trait.
//! [`Client`] implements it over HTTP with reqwest, decoding the stock
//! stream from server-sent events; the `testing` feature adds an in-memory
//! implementation with failure injection.

pub mod api;
pub mod client;
pub mod connection;
pub mod errors;
pub mod sse;
pub mod traits;

#[cfg(feature = "testing")]
pub mod testing;

pub use client::Client;
pub use connection::ConnectionInfo;
pub use errors::RemoteError;
pub use sse::{SseDecoder, SseEvent};
pub use traits::{RemoteStore, StockStream};
