//! Optimistic cart.
//!
//! Every line edit is applied locally first, then sent to the backend. If the
//! backend refuses, the line is put back exactly as it was before the edit.
//! Edits to one product run one after another; edits to different products
//! run concurrently. `clear`, `checkout` and `load` wait for in-flight edits
//! and hold off new ones, so no rollback can bring a line back into a cart
//! that was just emptied.

use core::fmt;
use core::future::Future;
use core::num::NonZeroU32;
use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use storefront_client::api::CartAddRequest;
use storefront_client::{RemoteError, RemoteStore};
use storefront_primitives::cart::{CartLine, CheckoutReceipt};
use storefront_primitives::product::{Product, ProductId};
use storefront_utils_locks::KeyedLocks;
use tokio::sync::{broadcast, watch, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::CartConfig;
use crate::errors::CartError;
use crate::CartNotice;

/// The most recently removed line, restorable until the undo window ends.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingRemoval {
    pub line: CartLine,
    /// Index the line had before removal.
    pub position: usize,
    pub removed_at: Instant,
}

#[derive(Debug, Default)]
struct CartState {
    lines: Vec<CartLine>,
    pending: Option<PendingRemoval>,
}

/// What a failed edit restores: the line and any pending removal of the
/// same product, as they were before the edit.
#[derive(Debug)]
struct Checkpoint {
    product_id: ProductId,
    line: Option<(usize, CartLine)>,
    pending: Option<PendingRemoval>,
}

impl CartState {
    fn position(&self, id: &ProductId) -> Option<usize> {
        self.lines.iter().position(|line| line.product_id == *id)
    }

    fn line(&self, id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id == *id)
    }

    fn line_mut(&mut self, id: &ProductId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|line| line.product_id == *id)
    }

    fn pending_for(&self, id: &ProductId) -> Option<&PendingRemoval> {
        self.pending
            .as_ref()
            .filter(|pending| pending.line.product_id == *id)
    }

    fn checkpoint(&self, id: &ProductId) -> Checkpoint {
        Checkpoint {
            product_id: id.clone(),
            line: self
                .position(id)
                .map(|position| (position, self.lines[position].clone())),
            pending: self.pending_for(id).cloned(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.lines
            .retain(|line| line.product_id != checkpoint.product_id);

        if let Some((position, line)) = checkpoint.line {
            let position = position.min(self.lines.len());
            self.lines.insert(position, line);
        }

        // A removal of another product made since then stays.
        match &self.pending {
            Some(pending) if pending.line.product_id != checkpoint.product_id => {}
            _ => self.pending = checkpoint.pending,
        }
    }

    fn reset(&mut self, lines: Vec<CartLine>) {
        self.lines = lines;
        self.pending = None;
    }
}

struct Inner<R> {
    remote: Arc<R>,
    config: CartConfig,
    state: Mutex<CartState>,
    lines: KeyedLocks<ProductId>,
    /// Held shared by line edits and exclusively by whole-cart operations.
    gate: RwLock<()>,
    notices: broadcast::Sender<CartNotice>,
    revision: watch::Sender<u64>,
}

pub struct CartReconciler<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for CartReconciler<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R> fmt::Debug for CartReconciler<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();

        f.debug_struct("CartReconciler")
            .field("lines", &state.lines)
            .field("pending", &state.pending)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl<R: RemoteStore> CartReconciler<R> {
    #[must_use]
    pub fn new(remote: Arc<R>, config: CartConfig) -> Self {
        let (notices, _rx) = broadcast::channel(config.notice_capacity.max(1));
        let (revision, _rx) = watch::channel(0);

        Self {
            inner: Arc::new(Inner {
                remote,
                config,
                state: Mutex::default(),
                lines: KeyedLocks::new(),
                gate: RwLock::new(()),
                notices,
                revision,
            }),
        }
    }

    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.inner.state.lock().lines.clone()
    }

    #[must_use]
    pub fn line(&self, id: &ProductId) -> Option<CartLine> {
        self.inner.state.lock().line(id).cloned()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().lines.is_empty()
    }

    /// Sum of `price × quantity` over all lines.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.inner.state.lock().lines.iter().map(CartLine::total).sum()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.inner
            .state
            .lock()
            .lines
            .iter()
            .map(|line| u64::from(line.quantity()))
            .sum()
    }

    /// The removal [`Self::undo_removal`] would restore, if still in time.
    #[must_use]
    pub fn pending_removal(&self) -> Option<PendingRemoval> {
        let state = self.inner.state.lock();

        state
            .pending
            .as_ref()
            .filter(|pending| !self.inner.is_expired(pending))
            .cloned()
    }

    #[must_use]
    pub fn notices(&self) -> broadcast::Receiver<CartNotice> {
        self.inner.notices.subscribe()
    }

    /// Receiver that ticks whenever the local lines change.
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Adds `quantity` units of `product`, creating its line if needed.
    ///
    /// Refused with [`CartError::OutOfStock`] when the line would exceed the
    /// product's known stock.
    pub async fn add_or_increment(&self, product: &Product, quantity: u32) -> Result<(), CartError> {
        let quantity = NonZeroU32::new(quantity).ok_or(CartError::InvalidQuantity(0))?;
        let product = product.clone();

        self.spawn(move |inner| async move {
            let _gate = inner.gate.read().await;
            let _line = inner.lines.lock(&product.id).await;

            inner.add(&product, quantity).await
        })
        .await
    }

    pub async fn set_quantity(&self, id: &ProductId, quantity: u32) -> Result<(), CartError> {
        let quantity = NonZeroU32::new(quantity).ok_or(CartError::InvalidQuantity(0))?;
        let id = id.clone();

        self.spawn(move |inner| async move {
            let _gate = inner.gate.read().await;
            let _line = inner.lines.lock(&id).await;

            inner.set(&id, quantity).await
        })
        .await
    }

    /// Changes a line by `delta` units. Dropping to zero or below removes the
    /// line, with the usual undo window.
    pub async fn adjust_quantity(&self, id: &ProductId, delta: i32) -> Result<(), CartError> {
        if delta == 0 {
            return Err(CartError::InvalidQuantity(0));
        }

        let id = id.clone();

        self.spawn(move |inner| async move {
            let _gate = inner.gate.read().await;
            let _line = inner.lines.lock(&id).await;

            let current = inner
                .state
                .lock()
                .line(&id)
                .map(CartLine::quantity)
                .ok_or_else(|| CartError::LineNotFound(id.clone()))?;

            let target = i64::from(current).saturating_add(i64::from(delta));

            match u32::try_from(target).ok().and_then(NonZeroU32::new) {
                Some(quantity) => inner.set(&id, quantity).await,
                None if target <= 0 => inner.remove(&id).await,
                None => Err(CartError::InvalidQuantity(target)),
            }
        })
        .await
    }

    /// Removes a line and keeps it as the single pending removal,
    /// superseding any earlier one.
    pub async fn remove(&self, id: &ProductId) -> Result<(), CartError> {
        let id = id.clone();

        self.spawn(move |inner| async move {
            let _gate = inner.gate.read().await;
            let _line = inner.lines.lock(&id).await;

            inner.remove(&id).await
        })
        .await
    }

    /// Restores the pending removal, locally and on the server.
    pub async fn undo_removal(&self) -> Result<(), CartError> {
        let id = self
            .pending_removal()
            .map(|pending| pending.line.product_id)
            .ok_or(CartError::NothingToUndo)?;

        self.spawn(move |inner| async move {
            let _gate = inner.gate.read().await;
            let _line = inner.lines.lock(&id).await;

            inner.undo(&id).await
        })
        .await
    }

    /// Empties the cart once the server confirms. Nothing changes locally if
    /// the server refuses.
    pub async fn clear(&self) -> Result<(), CartError> {
        self.spawn(|inner| async move {
            let _gate = inner.gate.write().await;

            match inner.remote.cart_clear().await {
                Ok(()) => {
                    inner.update(|state| state.reset(Vec::new()));
                    info!("Cart cleared");
                    Ok(())
                }
                Err(source) => Err(inner.fail(CartError::RemoteSyncFailed {
                    product_id: None,
                    source,
                })),
            }
        })
        .await
    }

    pub async fn checkout(&self) -> Result<CheckoutReceipt, CartError> {
        self.spawn(|inner| async move {
            let _gate = inner.gate.write().await;

            match inner.remote.cart_checkout().await {
                Ok(receipt) => {
                    inner.update(|state| state.reset(Vec::new()));
                    info!(order_id = ?receipt.order_id, "Checkout completed");
                    Ok(receipt)
                }
                Err(source) => Err(inner.fail(CartError::CheckoutFailed(source))),
            }
        })
        .await
    }

    /// Replaces the local lines with the server's cart.
    pub async fn load(&self) -> Result<(), CartError> {
        self.spawn(|inner| async move {
            let _gate = inner.gate.write().await;

            match inner.remote.cart_get().await {
                Ok(lines) => {
                    debug!(lines = lines.len(), "Loaded cart from server");
                    inner.update(|state| state.reset(lines));
                    Ok(())
                }
                Err(source) => Err(inner.fail(CartError::RemoteSyncFailed {
                    product_id: None,
                    source,
                })),
            }
        })
        .await
    }

    /// Runs an operation on its own task, so it completes or rolls back even
    /// when the caller stops waiting.
    async fn spawn<T, F, Fut>(&self, op: F) -> Result<T, CartError>
    where
        F: FnOnce(Arc<Inner<R>>) -> Fut,
        Fut: Future<Output = Result<T, CartError>> + Send + 'static,
        T: Send + 'static,
    {
        match tokio::spawn(op(Arc::clone(&self.inner))).await {
            Ok(result) => result,
            Err(err) => {
                error!(error = %err, "Cart operation task failed");
                Err(CartError::Aborted)
            }
        }
    }
}

impl<R: RemoteStore> Inner<R> {
    fn is_expired(&self, pending: &PendingRemoval) -> bool {
        pending.removed_at.elapsed() >= self.config.undo_window
    }

    fn update<T>(&self, mutate: impl FnOnce(&mut CartState) -> T) -> T {
        let out = mutate(&mut *self.state.lock());
        self.revision.send_modify(|revision| *revision = revision.wrapping_add(1));
        out
    }

    /// Publishes the notice for `err` and hands it back.
    fn fail(&self, err: CartError) -> CartError {
        warn!(error = %err, "Cart operation failed");

        if let Some(notice) = err.notice() {
            let _receivers = self.notices.send(notice);
        }

        err
    }

    /// Applies `mutate` locally, then awaits `dispatch` with what it
    /// returned. If the dispatch fails, the product's line and pending
    /// removal go back to how they were before `mutate`.
    ///
    /// A validation error from `mutate` must leave the state untouched.
    async fn optimistic<T, M, D, Fut>(
        &self,
        id: &ProductId,
        mutate: M,
        dispatch: D,
        on_failure: fn(ProductId, RemoteError) -> CartError,
    ) -> Result<(), CartError>
    where
        M: FnOnce(&mut CartState) -> Result<T, CartError>,
        D: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<(), RemoteError>>,
    {
        let (checkpoint, request) = {
            let mut state = self.state.lock();
            let checkpoint = state.checkpoint(id);
            let request = mutate(&mut *state)?;
            (checkpoint, request)
        };

        self.revision.send_modify(|revision| *revision = revision.wrapping_add(1));

        let Err(source) = dispatch(request).await else {
            return Ok(());
        };

        warn!(product_id = %id, error = %source, "Rolling back cart line");

        self.update(|state| state.restore(checkpoint));

        Err(self.fail(on_failure(id.clone(), source)))
    }

    async fn add(&self, product: &Product, quantity: NonZeroU32) -> Result<(), CartError> {
        let remote = &self.remote;

        self.optimistic(
            &product.id,
            |state| {
                // Unknown stock is left for the backend to validate.
                if let Some(stock) = product.stock {
                    let existing = state.line(&product.id).map_or(0, CartLine::quantity);
                    let available = stock.saturating_sub(existing);

                    if quantity.get() > available {
                        return Err(CartError::OutOfStock {
                            product_id: product.id.clone(),
                            requested: quantity.get(),
                            available,
                        });
                    }
                }

                let line = match state.line_mut(&product.id) {
                    Some(line) => {
                        line.quantity = line.quantity.saturating_add(quantity.get());
                        line.clone()
                    }
                    None => {
                        let line = CartLine::from_product(product, quantity);
                        state.lines.push(line.clone());
                        line
                    }
                };

                if state.pending_for(&product.id).is_some() {
                    state.pending = None;
                }

                Ok(CartAddRequest::new(&line, quantity.get()))
            },
            |request| async move { remote.cart_add(&request).await },
            sync_failed,
        )
        .await
    }

    async fn set(&self, id: &ProductId, quantity: NonZeroU32) -> Result<(), CartError> {
        let remote = &self.remote;

        self.optimistic(
            id,
            |state| {
                let line = state
                    .line_mut(id)
                    .ok_or_else(|| CartError::LineNotFound(id.clone()))?;
                line.quantity = quantity;
                Ok(())
            },
            |()| async move { remote.cart_set_quantity(id, quantity.get()).await },
            sync_failed,
        )
        .await
    }

    async fn remove(&self, id: &ProductId) -> Result<(), CartError> {
        let remote = &self.remote;

        self.optimistic(
            id,
            |state| {
                let position = state
                    .position(id)
                    .ok_or_else(|| CartError::LineNotFound(id.clone()))?;
                let line = state.lines.remove(position);

                let pending = PendingRemoval {
                    line,
                    position,
                    removed_at: Instant::now(),
                };

                if let Some(previous) = state.pending.replace(pending) {
                    debug!(product_id = %previous.line.product_id, "Pending removal superseded");
                }

                Ok(())
            },
            |()| async move { remote.cart_remove(id).await },
            |product_id, source| CartError::RemoveFailed { product_id, source },
        )
        .await
    }

    async fn undo(&self, id: &ProductId) -> Result<(), CartError> {
        let remote = &self.remote;
        let window = self.config.undo_window;

        self.optimistic(
            id,
            |state| {
                let pending = state
                    .pending_for(id)
                    .filter(|pending| pending.removed_at.elapsed() < window)
                    .cloned()
                    .ok_or(CartError::NothingToUndo)?;

                state.pending = None;

                let position = pending.position.min(state.lines.len());
                state.lines.insert(position, pending.line.clone());

                Ok(CartAddRequest::new(&pending.line, pending.line.quantity()))
            },
            |request| async move { remote.cart_add(&request).await },
            sync_failed,
        )
        .await
    }
}

fn sync_failed(product_id: ProductId, source: RemoteError) -> CartError {
    CartError::RemoteSyncFailed {
        product_id: Some(product_id),
        source,
    }
}
