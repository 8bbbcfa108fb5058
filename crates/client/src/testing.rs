//! In-memory [`RemoteStore`] for tests.
//!
//! Behaves like the backend for catalog and cart calls and lets tests inject
//! failures per operation, hold cart calls in flight, and push stock events
//! to every open stream.

use core::num::NonZeroU32;
use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use storefront_primitives::cart::{CartLine, CheckoutReceipt};
use storefront_primitives::product::{Product, ProductId};
use storefront_primitives::stock::StockDelta;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::api::CartAddRequest;
use crate::errors::RemoteError;
use crate::sse::SseEvent;
use crate::traits::{RemoteStore, StockStream};

/// Backend operations a test can make fail.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operation {
    FetchCatalog,
    SearchCatalog,
    FetchProduct,
    SubscribeStock,
    CartGet,
    CartAdd,
    CartSetQuantity,
    CartRemove,
    CartClear,
    CartCheckout,
}

type StockSender = mpsc::UnboundedSender<Result<SseEvent, RemoteError>>;

#[derive(Debug, Default)]
struct MockState {
    products: Vec<Product>,
    cart: Vec<CartLine>,
    failing: HashSet<Operation>,
    calls: Vec<Operation>,
    streams: Vec<StockSender>,
    orders: u32,
}

#[derive(Clone, Debug)]
pub struct MockRemoteStore {
    state: Arc<Mutex<MockState>>,
    hold: Arc<watch::Sender<bool>>,
}

impl Default for MockRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRemoteStore {
    #[must_use]
    pub fn new() -> Self {
        let (hold, _rx) = watch::channel(false);

        Self {
            state: Arc::default(),
            hold: Arc::new(hold),
        }
    }

    #[must_use]
    pub fn with_products(self, products: impl IntoIterator<Item = Product>) -> Self {
        self.state.lock().products = products.into_iter().collect();
        self
    }

    pub fn set_products(&self, products: impl IntoIterator<Item = Product>) {
        self.state.lock().products = products.into_iter().collect();
    }

    pub fn set_cart(&self, lines: impl IntoIterator<Item = CartLine>) {
        self.state.lock().cart = lines.into_iter().collect();
    }

    #[must_use]
    pub fn cart(&self) -> Vec<CartLine> {
        self.state.lock().cart.clone()
    }

    pub fn set_failing(&self, operation: Operation, failing: bool) {
        let mut state = self.state.lock();

        if failing {
            let _inserted = state.failing.insert(operation);
        } else {
            let _removed = state.failing.remove(&operation);
        }
    }

    /// Every call received so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<Operation> {
        self.state.lock().calls.clone()
    }

    #[must_use]
    pub fn call_count(&self, operation: Operation) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| **call == operation)
            .count()
    }

    /// Holds every cart call after it is recorded and before it completes,
    /// until [`Self::release_cart`].
    pub fn hold_cart(&self) {
        let _previous = self.hold.send_replace(true);
    }

    pub fn release_cart(&self) {
        let _previous = self.hold.send_replace(false);
    }

    #[must_use]
    pub fn open_streams(&self) -> usize {
        let mut state = self.state.lock();
        state.streams.retain(|tx| !tx.is_closed());
        state.streams.len()
    }

    pub fn push_stock(&self, delta: &StockDelta) {
        let payload = serde_json::to_string(delta).expect("stock delta serializes");

        self.push_event(SseEvent::message(payload));
    }

    /// Pushes an arbitrary event, e.g. a malformed payload.
    pub fn push_event(&self, event: SseEvent) {
        let mut state = self.state.lock();
        state.streams.retain(|tx| tx.send(Ok(event.clone())).is_ok());
    }

    /// Fails every open stream with a transport error and drops it.
    pub fn break_streams(&self) {
        let streams = core::mem::take(&mut self.state.lock().streams);

        for tx in streams {
            let _ignored = tx.send(Err(RemoteError::StreamClosed));
        }
    }

    fn record(&self, operation: Operation) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        state.calls.push(operation);

        if state.failing.contains(&operation) {
            return Err(RemoteError::rejected(
                503,
                Some(format!("{operation:?} unavailable")),
            ));
        }

        Ok(())
    }

    async fn cart_call(&self, operation: Operation) -> Result<(), RemoteError> {
        self.state.lock().calls.push(operation);

        let mut hold = self.hold.subscribe();
        let _released = hold.wait_for(|held| !*held).await.is_ok();

        if self.state.lock().failing.contains(&operation) {
            return Err(RemoteError::rejected(
                503,
                Some(format!("{operation:?} unavailable")),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MockRemoteStore {
    async fn fetch_catalog(&self, category: Option<&str>) -> Result<Vec<Product>, RemoteError> {
        self.record(Operation::FetchCatalog)?;

        let state = self.state.lock();

        Ok(state
            .products
            .iter()
            .filter(|p| category.map_or(true, |c| p.category.eq_ignore_ascii_case(c)))
            .cloned()
            .collect())
    }

    async fn search_catalog(&self, term: &str) -> Result<Vec<Product>, RemoteError> {
        self.record(Operation::SearchCatalog)?;

        let term = term.to_lowercase();
        let state = self.state.lock();

        Ok(state
            .products
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&term))
            .cloned()
            .collect())
    }

    async fn fetch_product(&self, id: &ProductId) -> Result<Product, RemoteError> {
        self.record(Operation::FetchProduct)?;

        self.state
            .lock()
            .products
            .iter()
            .find(|p| p.id == *id)
            .cloned()
            .ok_or_else(|| RemoteError::rejected(404, Some("Product not found".to_owned())))
    }

    async fn subscribe_stock_updates(&self) -> Result<StockStream, RemoteError> {
        self.record(Operation::SubscribeStock)?;

        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().streams.push(tx);

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn cart_get(&self) -> Result<Vec<CartLine>, RemoteError> {
        self.record(Operation::CartGet)?;

        Ok(self.state.lock().cart.clone())
    }

    async fn cart_add(&self, request: &CartAddRequest) -> Result<(), RemoteError> {
        self.cart_call(Operation::CartAdd).await?;

        let mut state = self.state.lock();

        if let Some(line) = state
            .cart
            .iter_mut()
            .find(|line| line.product_id == request.product_id)
        {
            line.quantity = line.quantity.saturating_add(request.quantity);
            return Ok(());
        }

        let Some(quantity) = NonZeroU32::new(request.quantity) else {
            return Err(RemoteError::rejected(400, Some("quantity must be positive".to_owned())));
        };

        state.cart.push(CartLine {
            product_id: request.product_id.clone(),
            quantity,
            price: request.price,
            name: request.name.clone(),
            image: request.image.clone(),
            category: request.category.clone(),
        });

        Ok(())
    }

    async fn cart_set_quantity(&self, id: &ProductId, quantity: u32) -> Result<(), RemoteError> {
        self.cart_call(Operation::CartSetQuantity).await?;

        let Some(quantity) = NonZeroU32::new(quantity) else {
            return Err(RemoteError::rejected(400, Some("quantity must be positive".to_owned())));
        };

        let mut state = self.state.lock();
        let line = state
            .cart
            .iter_mut()
            .find(|line| line.product_id == *id)
            .ok_or_else(|| RemoteError::rejected(404, Some("Item not in cart".to_owned())))?;

        line.quantity = quantity;

        Ok(())
    }

    async fn cart_remove(&self, id: &ProductId) -> Result<(), RemoteError> {
        self.cart_call(Operation::CartRemove).await?;

        self.state.lock().cart.retain(|line| line.product_id != *id);

        Ok(())
    }

    async fn cart_clear(&self) -> Result<(), RemoteError> {
        self.cart_call(Operation::CartClear).await?;

        self.state.lock().cart.clear();

        Ok(())
    }

    async fn cart_checkout(&self) -> Result<CheckoutReceipt, RemoteError> {
        self.cart_call(Operation::CartCheckout).await?;

        let mut state = self.state.lock();

        if state.cart.is_empty() {
            return Err(RemoteError::rejected(400, Some("Cart is empty".to_owned())));
        }

        state.cart.clear();
        state.orders = state.orders.saturating_add(1);

        Ok(CheckoutReceipt {
            order_id: Some(format!("order-{}", state.orders)),
        })
    }
}
