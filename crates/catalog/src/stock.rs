//! Live stock stream.
//!
//! One background task per [`StockSynchronizer`] reads the server-push stream
//! and hands every delta to a [`StockSink`]. The task runs while at least one
//! [`StockSubscription`] is alive and is restarted lazily by the next one.
//!
//! ```text
//! Disconnected -> Connecting -> Streaming -> Error -> Reconnecting -> Streaming
//!                                                                 \-> Disconnected
//! ```

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use parking_lot::Mutex;
use storefront_client::{RemoteStore, StockStream};
use storefront_primitives::stock::StockDelta;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::StockConfig;

/// Whatever holds product records that stock deltas should patch.
pub trait StockSink: Send + Sync + 'static {
    /// Applies `delta` to every held record of its product and returns how
    /// many records matched. Must not block on async work.
    fn apply(&self, delta: &StockDelta) -> usize;
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum StreamState {
    #[default]
    Disconnected,
    Connecting,
    Streaming,
    Error,
    Reconnecting,
}

/// Advisory conditions for the view layer.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum StockNotice {
    /// Shown stock may be outdated. Published once per reconnect attempt.
    Degraded { attempt: u32, reason: String },
    /// Streaming again after `attempts` failed attempts.
    Resumed { attempts: u32 },
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StockStats {
    pub received: u64,
    pub applied: u64,
    pub unmatched: u64,
    pub malformed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    applied: AtomicU64,
    unmatched: AtomicU64,
    malformed: AtomicU64,
}

#[derive(Debug)]
struct Running {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Debug, Default)]
struct Control {
    subscribers: usize,
    run_id: u64,
    running: Option<Running>,
    closed: bool,
}

struct Inner {
    remote: Arc<dyn RemoteStore>,
    sink: Arc<dyn StockSink>,
    config: StockConfig,
    control: Mutex<Control>,
    state: watch::Sender<StreamState>,
    notices: broadcast::Sender<StockNotice>,
    counters: Counters,
}

#[derive(Clone)]
pub struct StockSynchronizer {
    inner: Arc<Inner>,
}

impl fmt::Debug for StockSynchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StockSynchronizer")
            .field("state", &*self.inner.state.borrow())
            .field("subscribers", &self.inner.control.lock().subscribers)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl StockSynchronizer {
    #[must_use]
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        sink: Arc<dyn StockSink>,
        config: StockConfig,
    ) -> Self {
        let (state, _rx) = watch::channel(StreamState::Disconnected);
        let (notices, _rx) = broadcast::channel(config.notice_capacity.max(1));

        Self {
            inner: Arc::new(Inner {
                remote,
                sink,
                config,
                control: Mutex::default(),
                state,
                notices,
                counters: Counters::default(),
            }),
        }
    }

    /// Registers interest in live stock, opening the stream if this is the
    /// first subscriber. Must be called within a tokio runtime.
    #[must_use]
    pub fn subscribe(&self) -> StockSubscription {
        let mut control = self.inner.control.lock();
        control.subscribers = control.subscribers.saturating_add(1);

        if control.running.is_none() && !control.closed {
            self.inner.start(&mut control);
        }

        StockSubscription {
            inner: Arc::clone(&self.inner),
        }
    }

    #[must_use]
    pub fn subscribers(&self) -> usize {
        self.inner.control.lock().subscribers
    }

    #[must_use]
    pub fn current_state(&self) -> StreamState {
        *self.inner.state.borrow()
    }

    #[must_use]
    pub fn state(&self) -> watch::Receiver<StreamState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn notices(&self) -> broadcast::Receiver<StockNotice> {
        self.inner.notices.subscribe()
    }

    #[must_use]
    pub fn stats(&self) -> StockStats {
        let counters = &self.inner.counters;

        StockStats {
            received: counters.received.load(Ordering::Relaxed),
            applied: counters.applied.load(Ordering::Relaxed),
            unmatched: counters.unmatched.load(Ordering::Relaxed),
            malformed: counters.malformed.load(Ordering::Relaxed),
        }
    }

    /// Closes the stream for good; later subscriptions no longer open it.
    pub async fn shutdown(&self) {
        let running = {
            let mut control = self.inner.control.lock();
            control.closed = true;
            control.running.take()
        };

        let _previous = self.inner.state.send_replace(StreamState::Disconnected);

        if let Some(running) = running {
            running.token.cancel();

            if let Err(err) = running.handle.await {
                warn!(error = %err, "Stock stream task ended abnormally");
            }
        }
    }
}

/// Keeps the stock stream open while alive.
pub struct StockSubscription {
    inner: Arc<Inner>,
}

impl fmt::Debug for StockSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StockSubscription").finish_non_exhaustive()
    }
}

impl Drop for StockSubscription {
    fn drop(&mut self) {
        let mut control = self.inner.control.lock();
        control.subscribers = control.subscribers.saturating_sub(1);

        if control.subscribers > 0 {
            return;
        }

        if let Some(running) = control.running.take() {
            debug!("Last stock subscriber left, closing stream");
            running.token.cancel();
            let _previous = self.inner.state.send_replace(StreamState::Disconnected);
        }
    }
}

enum Exit {
    Cancelled,
    Lost(String),
}

impl Inner {
    fn start(self: &Arc<Self>, control: &mut Control) {
        control.run_id = control.run_id.wrapping_add(1);

        let token = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(self).run(token.clone(), control.run_id));

        control.running = Some(Running { token, handle });
    }

    /// Publishes `state` unless this run has been superseded or stopped.
    fn set_state(&self, run_id: u64, state: StreamState) {
        let control = self.control.lock();

        if control.run_id == run_id && control.running.is_some() {
            let _previous = self.state.send_replace(state);
        }
    }

    fn notify(&self, notice: StockNotice) {
        // Nobody listening is fine.
        let _receivers = self.notices.send(notice);
    }

    async fn run(self: Arc<Self>, token: CancellationToken, run_id: u64) {
        let mut attempt: u32 = 0;

        loop {
            self.set_state(
                run_id,
                if attempt == 0 {
                    StreamState::Connecting
                } else {
                    StreamState::Reconnecting
                },
            );

            let opened = tokio::select! {
                biased;
                () = token.cancelled() => break,
                opened = self.remote.subscribe_stock_updates() => opened,
            };

            let reason = match opened {
                Ok(stream) => {
                    self.set_state(run_id, StreamState::Streaming);

                    if attempt == 0 {
                        info!("Stock stream connected");
                    } else {
                        info!(attempts = attempt, "Stock stream resumed");
                        self.notify(StockNotice::Resumed { attempts: attempt });
                    }

                    attempt = 0;

                    match self.pump(stream, &token).await {
                        Exit::Cancelled => break,
                        Exit::Lost(reason) => reason,
                    }
                }
                Err(err) => err.to_string(),
            };

            self.set_state(run_id, StreamState::Error);

            attempt = attempt.saturating_add(1);
            let delay = self.config.backoff_delay(attempt);

            warn!(attempt, ?delay, %reason, "Stock stream lost, reconnecting");
            self.notify(StockNotice::Degraded { attempt, reason });

            tokio::select! {
                biased;
                () = token.cancelled() => break,
                () = sleep(delay) => {}
            }
        }

        debug!(run_id, "Stock stream task stopped");
    }

    async fn pump(&self, mut stream: StockStream, token: &CancellationToken) -> Exit {
        loop {
            let next = tokio::select! {
                biased;
                () = token.cancelled() => return Exit::Cancelled,
                next = stream.next() => next,
            };

            let event = match next {
                Some(Ok(event)) => event,
                Some(Err(err)) => return Exit::Lost(err.to_string()),
                None => return Exit::Lost("stream ended".to_owned()),
            };

            if event.is_close() {
                return Exit::Lost("server closed the stream".to_owned());
            }

            if !event.is_message() {
                debug!(event = ?event.event, "Ignoring stream control event");
                continue;
            }

            self.handle(&event.data);
        }
    }

    fn handle(&self, payload: &str) {
        let _received = self.counters.received.fetch_add(1, Ordering::Relaxed);

        let delta = match StockDelta::parse(payload) {
            Ok(delta) => delta,
            Err(err) => {
                let _malformed = self.counters.malformed.fetch_add(1, Ordering::Relaxed);
                warn!(error = %err, payload, "Dropping malformed stock payload");
                return;
            }
        };

        let matched = self.sink.apply(&delta);

        if matched == 0 {
            let _unmatched = self.counters.unmatched.fetch_add(1, Ordering::Relaxed);
            debug!(product_id = %delta.product_id, "Stock update for a product nobody holds");
        } else {
            let _applied = self.counters.applied.fetch_add(1, Ordering::Relaxed);
            debug!(
                product_id = %delta.product_id,
                new_stock = delta.new_stock,
                matched,
                "Applied stock update"
            );
        }
    }
}
