use core::time::Duration;
use std::collections::BTreeMap;
use std::fs::{read_to_string, write};

use camino::Utf8Path;
use eyre::{Result as EyreResult, WrapErr};
use serde::{Deserialize, Serialize};
use storefront_cart::config::CartConfig;
use storefront_catalog::config::{CatalogConfig, StockConfig};
use storefront_primitives::common::serde_duration;
use url::Url;

pub mod hints;

pub const CONFIG_FILE: &str = "storefront.toml";

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[non_exhaustive]
pub struct ConfigFile {
    pub remote: RemoteConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub stock: StockConfig,

    #[serde(default)]
    pub cart: CartConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[non_exhaustive]
pub struct RemoteConfig {
    pub api_url: Url,
    #[serde(rename = "timeout_ms", with = "serde_duration")]
    pub timeout: Duration,
}

impl RemoteConfig {
    #[must_use]
    pub const fn new(api_url: Url, timeout: Duration) -> Self {
        Self { api_url, timeout }
    }
}

impl ConfigFile {
    #[must_use]
    pub const fn new(
        remote: RemoteConfig,
        catalog: CatalogConfig,
        stock: StockConfig,
        cart: CartConfig,
    ) -> Self {
        Self {
            remote,
            catalog,
            stock,
            cart,
        }
    }

    /// Config with default tuning for the backend at `api_url`.
    #[must_use]
    pub fn with_api_url(api_url: Url) -> Self {
        Self::new(
            RemoteConfig::new(api_url, Duration::from_secs(10)),
            CatalogConfig::default(),
            StockConfig::default(),
            CartConfig::default(),
        )
    }

    #[must_use]
    pub fn exists(dir: &Utf8Path) -> bool {
        dir.join(CONFIG_FILE).is_file()
    }

    pub fn load(dir: &Utf8Path) -> EyreResult<Self> {
        let path = dir.join(CONFIG_FILE);
        let content = read_to_string(&path)
            .wrap_err_with(|| format!("failed to read configuration from {path:?}"))?;

        toml::from_str(&content)
            .wrap_err_with(|| format!("failed to parse configuration in {path:?}"))
    }

    pub fn save(&self, dir: &Utf8Path) -> EyreResult<()> {
        let path = dir.join(CONFIG_FILE);
        let content = toml::to_string_pretty(self)?;

        write(&path, content)
            .wrap_err_with(|| format!("failed to write configuration to {path:?}"))?;

        Ok(())
    }

    /// Only write config file if changes are detected
    pub fn save_if_changed(&self, dir: &Utf8Path) -> EyreResult<bool> {
        let path = dir.join(CONFIG_FILE);
        let new_content = toml::to_string_pretty(self)?;

        let changed = match read_to_string(&path) {
            Ok(existing) => existing != new_content,
            Err(_) => true,
        };

        if changed {
            write(&path, new_content)
                .wrap_err_with(|| format!("failed to write configuration to {path:?}"))?;
        }

        Ok(changed)
    }

    /// Editable keys with example values
    #[must_use]
    pub fn editable_keys() -> BTreeMap<&'static str, Vec<&'static str>> {
        BTreeMap::from([
            ("remote.api_url", vec!["https://shop.example.com"]),
            ("remote.timeout_ms", vec!["2000", "10000", "30000"]),
            ("catalog.batch_size", vec!["8", "12", "24"]),
            ("stock.reconnect_initial_ms", vec!["250", "500", "1000"]),
            ("stock.reconnect_max_ms", vec!["10000", "30000", "60000"]),
            ("stock.notice_capacity", vec!["16", "32", "64"]),
            ("cart.undo_window_ms", vec!["3000", "5000", "10000"]),
            ("cart.notice_capacity", vec!["16", "32", "64"]),
        ])
    }

    /// Get the value for a specific config key
    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<String> {
        let value = match key {
            "remote.api_url" => self.remote.api_url.to_string(),
            "remote.timeout_ms" => self.remote.timeout.as_millis().to_string(),
            "catalog.batch_size" => self.catalog.batch_size.to_string(),
            "stock.reconnect_initial_ms" => self.stock.reconnect_initial.as_millis().to_string(),
            "stock.reconnect_max_ms" => self.stock.reconnect_max.as_millis().to_string(),
            "stock.notice_capacity" => self.stock.notice_capacity.to_string(),
            "cart.undo_window_ms" => self.cart.undo_window.as_millis().to_string(),
            "cart.notice_capacity" => self.cart.notice_capacity.to_string(),
            _ => return None,
        };

        Some(value)
    }

    #[must_use]
    pub fn hint_for(key: &str) -> Option<&'static hints::ConfigHint> {
        hints::CONFIG_HINTS.iter().find(|hint| hint.key == key)
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    use super::*;

    fn temp_dir() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, path)
    }

    fn config() -> ConfigFile {
        ConfigFile::with_api_url("https://shop.example.com".parse().unwrap())
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let (_guard, dir) = temp_dir();

        assert!(!ConfigFile::exists(&dir));
        config().save(&dir).unwrap();
        assert!(ConfigFile::exists(&dir));

        assert_eq!(ConfigFile::load(&dir).unwrap(), config());
    }

    #[test]
    fn test_sections_default_when_missing() {
        let (_guard, dir) = temp_dir();

        write(
            dir.join(CONFIG_FILE),
            "[remote]\napi_url = \"https://shop.example.com/\"\ntimeout_ms = 2500\n",
        )
        .unwrap();

        let loaded = ConfigFile::load(&dir).unwrap();

        assert_eq!(loaded.remote.timeout, Duration::from_millis(2500));
        assert_eq!(loaded.catalog.batch_size.get(), 12);
        assert_eq!(loaded.stock.reconnect_initial, Duration::from_millis(500));
        assert_eq!(loaded.stock.reconnect_max, Duration::from_secs(30));
        assert_eq!(loaded.cart.undo_window, Duration::from_secs(5));
    }

    #[test]
    fn test_partial_sections_fill_missing_keys() {
        let (_guard, dir) = temp_dir();

        write(
            dir.join(CONFIG_FILE),
            "[remote]\napi_url = \"https://shop.example.com/\"\ntimeout_ms = 2500\n\n\
             [stock]\nnotice_capacity = 8\n\n\
             [cart]\nnotice_capacity = 4\n",
        )
        .unwrap();

        let loaded = ConfigFile::load(&dir).unwrap();

        assert_eq!(loaded.stock.notice_capacity, 8);
        assert_eq!(loaded.stock.reconnect_initial, Duration::from_millis(500));
        assert_eq!(loaded.stock.reconnect_max, Duration::from_secs(30));
        assert_eq!(loaded.cart.notice_capacity, 4);
        assert_eq!(loaded.cart.undo_window, Duration::from_secs(5));
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let (_guard, dir) = temp_dir();

        write(
            dir.join(CONFIG_FILE),
            "[remote]\napi_url = \"https://shop.example.com/\"\ntimeout_ms = 1\n\n[catalog]\nbatch_size = 0\n",
        )
        .unwrap();

        assert!(ConfigFile::load(&dir).is_err());
    }

    #[test]
    fn test_save_if_changed() {
        let (_guard, dir) = temp_dir();
        let mut config = config();

        assert!(config.save_if_changed(&dir).unwrap());
        assert!(!config.save_if_changed(&dir).unwrap());

        config.cart.undo_window = Duration::from_secs(9);
        assert!(config.save_if_changed(&dir).unwrap());
        assert_eq!(
            ConfigFile::load(&dir).unwrap().get_value("cart.undo_window_ms"),
            Some("9000".to_owned())
        );
    }

    #[test]
    fn test_every_editable_key_has_value_and_hint() {
        let config = config();

        for key in ConfigFile::editable_keys().keys() {
            assert!(config.get_value(key).is_some(), "no value for {key}");
            assert!(ConfigFile::hint_for(key).is_some(), "no hint for {key}");
        }

        assert_eq!(config.get_value("nope"), None);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let (_guard, dir) = temp_dir();

        let err = ConfigFile::load(&dir).unwrap_err();

        assert!(format!("{err}").contains(CONFIG_FILE));
    }
}
