//! Cached catalog snapshots and the views paginating over them.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use storefront_client::RemoteStore;
use storefront_primitives::product::{Product, ProductId};
use storefront_primitives::query::{FetchTarget, QuerySpec};
use storefront_primitives::stock::StockDelta;
use storefront_utils_locks::KeyedLocks;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::cache::LocalCache;
use crate::config::{CatalogConfig, StockConfig};
use crate::errors::CatalogError;
use crate::query::{Page, QueryEngine};
use crate::stock::{StockSink, StockSubscription, StockSynchronizer};

/// Window state of one open view.
#[derive(Debug)]
struct ViewSlot {
    spec: QuerySpec,
    snapshot: Vec<Product>,
    visible: Vec<Product>,
    /// Window boundary handed out by the last reset or `load_more`. Stock
    /// patches rebuild the window to this length and never move it.
    delivered: usize,
    has_more: bool,
    revision: watch::Sender<u64>,
}

impl ViewSlot {
    fn new(
        spec: QuerySpec,
        snapshot: Vec<Product>,
        page: Page,
        revision: watch::Sender<u64>,
    ) -> Self {
        Self {
            spec,
            snapshot,
            delivered: page.items.len(),
            visible: page.items,
            has_more: page.has_more,
            revision,
        }
    }

    fn reset(&mut self, spec: QuerySpec, snapshot: Vec<Product>, page: Page) {
        self.spec = spec;
        self.snapshot = snapshot;
        self.delivered = page.items.len();
        self.visible = page.items;
        self.has_more = page.has_more;
        self.bump();
    }

    /// Grows the window by one batch and returns how many items it gained.
    fn extend(&mut self, engine: &QueryEngine) -> usize {
        let mut page = engine.apply(&self.snapshot, &self.spec, self.delivered);
        let tail = page.items.split_off(self.visible.len().min(page.items.len()));
        let added = tail.len();

        self.visible.extend(tail);
        self.delivered = self.delivered.max(self.visible.len());
        self.has_more = page.has_more;

        if added > 0 {
            self.bump();
        }

        added
    }

    fn patch(&mut self, engine: &QueryEngine, delta: &StockDelta) -> usize {
        let matched = self
            .snapshot
            .iter_mut()
            .map(|product| product.apply_stock(delta))
            .filter(|matched| *matched)
            .count();

        if matched > 0 {
            let page = engine.window(&self.snapshot, &self.spec, self.delivered);
            self.visible = page.items;
            self.has_more = page.has_more;
            self.bump();
        }

        matched
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision = revision.wrapping_add(1));
    }
}

#[derive(Debug, Default)]
struct CatalogState {
    cache: LocalCache,
    views: HashMap<u64, Arc<Mutex<ViewSlot>>>,
}

/// Everything stock deltas patch: cached snapshots and open view windows.
#[derive(Debug)]
struct Held {
    engine: QueryEngine,
    state: Mutex<CatalogState>,
}

impl StockSink for Held {
    fn apply(&self, delta: &StockDelta) -> usize {
        let mut state = self.state.lock();

        let mut matched = state.cache.patch_stock(delta);

        for slot in state.views.values() {
            matched = matched.saturating_add(slot.lock().patch(&self.engine, delta));
        }

        matched
    }
}

pub struct Catalog<R> {
    remote: Arc<R>,
    held: Arc<Held>,
    fetches: KeyedLocks<QuerySpec>,
    stock: StockSynchronizer,
    next_view: Arc<AtomicU64>,
}

impl<R> Clone for Catalog<R> {
    fn clone(&self) -> Self {
        Self {
            remote: Arc::clone(&self.remote),
            held: Arc::clone(&self.held),
            fetches: self.fetches.clone(),
            stock: self.stock.clone(),
            next_view: Arc::clone(&self.next_view),
        }
    }
}

impl<R> fmt::Debug for Catalog<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.held.state.lock();

        f.debug_struct("Catalog")
            .field("engine", &self.held.engine)
            .field("cached", &state.cache.len())
            .field("views", &state.views.len())
            .field("stock", &self.stock)
            .finish_non_exhaustive()
    }
}

impl<R: RemoteStore> Catalog<R> {
    #[must_use]
    pub fn new(remote: Arc<R>, config: &CatalogConfig, stock: StockConfig) -> Self {
        let held = Arc::new(Held {
            engine: QueryEngine::new(config.batch_size),
            state: Mutex::default(),
        });

        let stock_remote: Arc<dyn RemoteStore> = Arc::<R>::clone(&remote);
        let sink: Arc<dyn StockSink> = Arc::<Held>::clone(&held);
        let stock = StockSynchronizer::new(stock_remote, sink, stock);

        Self {
            remote,
            held,
            fetches: KeyedLocks::new(),
            stock,
            next_view: Arc::default(),
        }
    }

    #[must_use]
    pub fn engine(&self) -> &QueryEngine {
        &self.held.engine
    }

    #[must_use]
    pub const fn stock(&self) -> &StockSynchronizer {
        &self.stock
    }

    /// Raw snapshot for `spec`, served from the cache when present.
    pub async fn products(&self, spec: &QuerySpec) -> Result<Vec<Product>, CatalogError> {
        self.snapshot(spec, false).await
    }

    /// Replaces the cached snapshot for `spec` with a fresh fetch.
    pub async fn refresh(&self, spec: &QuerySpec) -> Result<Vec<Product>, CatalogError> {
        self.snapshot(spec, true).await
    }

    /// The results for `spec` up to one batch past `delivered`.
    pub async fn page(&self, spec: &QuerySpec, delivered: usize) -> Result<Page, CatalogError> {
        let snapshot = self.snapshot(spec, false).await?;

        Ok(self.held.engine.apply(&snapshot, spec, delivered))
    }

    /// Reads one product from the backend.
    ///
    /// The stock it carries is fresher than any held copy, so it is written
    /// through to every cached snapshot and open view.
    pub async fn product(&self, id: &ProductId) -> Result<Product, CatalogError> {
        let product = self.remote.fetch_product(id).await.map_err(|source| {
            warn!(%id, error = %source, "Product fetch failed");
            CatalogError::ProductUnavailable {
                id: id.clone(),
                source,
            }
        })?;

        if let Some(stock) = product.stock {
            let _matched = self.held.apply(&StockDelta::new(product.id.clone(), stock));
        }

        Ok(product)
    }

    /// First held copy of `id`, from any cached snapshot or open view.
    #[must_use]
    pub fn cached_product(&self, id: &ProductId) -> Option<Product> {
        let state = self.held.state.lock();

        if let Some(product) = state
            .views
            .values()
            .find_map(|slot| slot.lock().snapshot.iter().find(|p| p.id == *id).cloned())
        {
            return Some(product);
        }

        state.cache.get_product(id).cloned()
    }

    pub fn invalidate(&self, spec: &QuerySpec) -> bool {
        self.held.state.lock().cache.invalidate(spec)
    }

    pub fn clear_cache(&self) {
        self.held.state.lock().cache.clear();
    }

    #[must_use]
    pub fn cached_queries(&self) -> usize {
        self.held.state.lock().cache.len()
    }

    /// Opens a view on the first page of `spec` and keeps it patched by the
    /// live stock stream until dropped.
    pub async fn open_view(&self, spec: QuerySpec) -> Result<CatalogView<R>, CatalogError> {
        let subscription = self.stock.subscribe();
        let fetched = self.snapshot(&spec, false).await?;

        let id = self.next_view.fetch_add(1, Ordering::Relaxed);
        let (revision, changes) = watch::channel(0);

        let mut state = self.held.state.lock();
        let snapshot = state.cache.get(&spec).map_or(fetched, <[Product]>::to_vec);
        let page = self.held.engine.apply(&snapshot, &spec, 0);

        let slot = Arc::new(Mutex::new(ViewSlot::new(spec, snapshot, page, revision)));

        let _previous = state.views.insert(id, Arc::clone(&slot));
        drop(state);

        debug!(view = id, "Opened catalog view");

        Ok(CatalogView {
            catalog: self.clone(),
            id,
            slot,
            changes,
            _stock: subscription,
        })
    }

    pub async fn shutdown(&self) {
        self.stock.shutdown().await;
    }

    async fn snapshot(&self, spec: &QuerySpec, force: bool) -> Result<Vec<Product>, CatalogError> {
        let seen = self.held.state.lock().cache.generation(spec);

        let _fetch = self.fetches.lock(spec).await;

        {
            let state = self.held.state.lock();

            if let Some(products) = state.cache.get(spec) {
                // A refresh that waited behind another fetch reuses its result.
                if !force || state.cache.generation(spec) != seen {
                    debug!(?spec, "Catalog cache hit");
                    return Ok(products.to_vec());
                }
            }
        }

        debug!(?spec, force, "Fetching catalog snapshot");

        let fetched = match spec.fetch_target() {
            FetchTarget::Category(category) => self.remote.fetch_catalog(category).await,
            FetchTarget::Search(term) => self.remote.search_catalog(term).await,
        };

        let products = fetched.map_err(|err| {
            warn!(?spec, error = %err, "Catalog fetch failed");
            CatalogError::FetchFailed(err)
        })?;

        let _generation = self
            .held
            .state
            .lock()
            .cache
            .put(spec.clone(), products.clone());

        Ok(products)
    }

    /// Swaps the snapshot of `slot` for the cached one (or `fetched`) under
    /// the catalog lock, so no stock delta falls between the two.
    fn install(
        &self,
        slot: &Mutex<ViewSlot>,
        spec: QuerySpec,
        fetched: Vec<Product>,
        window: Option<usize>,
    ) {
        let state = self.held.state.lock();
        let snapshot = state.cache.get(&spec).map_or(fetched, <[Product]>::to_vec);

        let page = match window {
            Some(len) => self.held.engine.window(&snapshot, &spec, len),
            None => self.held.engine.apply(&snapshot, &spec, 0),
        };

        slot.lock().reset(spec, snapshot, page);
    }
}

/// A paginated window over one query.
///
/// The visible items are always a prefix of the engine's output for the
/// current query and the view's snapshot.
pub struct CatalogView<R: RemoteStore> {
    catalog: Catalog<R>,
    id: u64,
    slot: Arc<Mutex<ViewSlot>>,
    changes: watch::Receiver<u64>,
    _stock: StockSubscription,
}

impl<R: RemoteStore> fmt::Debug for CatalogView<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.lock();

        f.debug_struct("CatalogView")
            .field("id", &self.id)
            .field("spec", &slot.spec)
            .field("visible", &slot.visible.len())
            .field("has_more", &slot.has_more)
            .finish_non_exhaustive()
    }
}

impl<R: RemoteStore> CatalogView<R> {
    #[must_use]
    pub fn spec(&self) -> QuerySpec {
        self.slot.lock().spec.clone()
    }

    #[must_use]
    pub fn visible(&self) -> Vec<Product> {
        self.slot.lock().visible.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slot.lock().visible.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slot.lock().visible.is_empty()
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.slot.lock().has_more
    }

    /// Receiver that ticks whenever the visible window changes.
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.changes.clone()
    }

    /// Switches to `spec` and restarts pagination from the first batch.
    ///
    /// On failure the view keeps showing its previous query.
    pub async fn navigate(&mut self, spec: QuerySpec) -> Result<(), CatalogError> {
        let fetched = self.catalog.snapshot(&spec, false).await?;

        debug!(view = self.id, ?spec, "Catalog view navigated");

        self.catalog.install(&self.slot, spec, fetched, None);

        Ok(())
    }

    /// Refetches the current query, keeping the number of delivered items.
    pub async fn refresh(&mut self) -> Result<(), CatalogError> {
        let spec = self.spec();
        let fetched = self.catalog.snapshot(&spec, true).await?;

        let len = self
            .slot
            .lock()
            .delivered
            .max(self.catalog.engine().batch_size());
        self.catalog.install(&self.slot, spec, fetched, Some(len));

        Ok(())
    }

    /// Appends the next batch and returns how many items were added.
    pub fn load_more(&mut self) -> usize {
        self.slot.lock().extend(self.catalog.engine())
    }
}

impl<R: RemoteStore> Drop for CatalogView<R> {
    fn drop(&mut self) {
        let _removed = self.catalog.held.state.lock().views.remove(&self.id);
        debug!(view = self.id, "Closed catalog view");
    }
}
