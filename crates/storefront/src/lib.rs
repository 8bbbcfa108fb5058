//! Storefront catalog sync and cart reconciliation.
//!
//! [`Storefront`] is the explicit context that owns one catalog (with its
//! live stock stream) and one cart, both talking to the same backend. Create
//! it once per session and call [`Storefront::shutdown`] when done.

use core::fmt;
use std::sync::Arc;

use camino::Utf8Path;
use eyre::{Result as EyreResult, WrapErr};
use storefront_cart::CartReconciler;
use storefront_catalog::Catalog;
use storefront_client::{Client, ConnectionInfo, RemoteStore};
use storefront_config::ConfigFile;
use tracing::info;

pub use storefront_cart as cart;
pub use storefront_catalog as catalog;
pub use storefront_client as client;
pub use storefront_config as config;
pub use storefront_primitives as primitives;

pub struct Storefront<R: RemoteStore = Client> {
    remote: Arc<R>,
    config: ConfigFile,
    catalog: Catalog<R>,
    cart: CartReconciler<R>,
}

impl<R: RemoteStore> fmt::Debug for Storefront<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storefront")
            .field("config", &self.config)
            .field("catalog", &self.catalog)
            .field("cart", &self.cart)
            .finish_non_exhaustive()
    }
}

impl Storefront<Client> {
    /// Builds the HTTP client from `config`. No request is made until a view
    /// is opened or the cart is used.
    pub fn connect(config: ConfigFile) -> EyreResult<Self> {
        let connection = ConnectionInfo::new(config.remote.api_url.clone(), config.remote.timeout)
            .wrap_err_with(|| format!("failed to set up client for {}", config.remote.api_url))?;

        info!(api_url = %config.remote.api_url, "Storefront connected");

        Ok(Self::with_remote(Arc::new(Client::new(connection)), config))
    }

    pub fn connect_from_dir(dir: &Utf8Path) -> EyreResult<Self> {
        let config = ConfigFile::load(dir)?;

        Self::connect(config)
    }
}

impl<R: RemoteStore> Storefront<R> {
    #[must_use]
    pub fn with_remote(remote: Arc<R>, config: ConfigFile) -> Self {
        let catalog = Catalog::new(Arc::clone(&remote), &config.catalog, config.stock);
        let cart = CartReconciler::new(Arc::clone(&remote), config.cart);

        Self {
            remote,
            config,
            catalog,
            cart,
        }
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog<R> {
        &self.catalog
    }

    #[must_use]
    pub const fn cart(&self) -> &CartReconciler<R> {
        &self.cart
    }

    #[must_use]
    pub const fn config(&self) -> &ConfigFile {
        &self.config
    }

    #[must_use]
    pub const fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    /// Closes the stock stream. Cart operations already in flight still
    /// finish or roll back.
    pub async fn shutdown(&self) {
        self.catalog.shutdown().await;
        info!("Storefront shut down");
    }
}
