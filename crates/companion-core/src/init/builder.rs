//! Builder for wiring an [`AppInitializer`].

use std::path::PathBuf;
use std::sync::Arc;

use super::AppInitializer;
use crate::bootstrap::{BootstrapSettings, ConfigBootstrap};
use crate::config::PathsConfig;
use crate::error::Result;
use crate::network::{ConnectivityConfig, ConnectivityMonitor, ConnectivityProbe, HttpProbe, ResilientClient};
use crate::storage::{FileStore, KeyValueStore};

/// Builder for configuring app initialization.
///
/// # Example
///
/// ```rust,ignore
/// use companion_core::AppInitializer;
///
/// let app = AppInitializer::builder("./data")
///     .with_endpoint("https://config.example.com")
///     .build()?;
/// let state = app.start().await;
/// ```
pub struct AppInitializerBuilder {
    data_dir: PathBuf,
    probe: Option<Arc<dyn ConnectivityProbe>>,
    store: Option<Arc<dyn KeyValueStore>>,
    connectivity: ConnectivityConfig,
    bootstrap: BootstrapSettings,
}

impl AppInitializerBuilder {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            probe: None,
            store: None,
            connectivity: ConnectivityConfig::default(),
            bootstrap: BootstrapSettings::default(),
        }
    }

    /// Use a custom connectivity probe.
    ///
    /// Default: [`HttpProbe`] against the built-in probe URLs.
    pub fn with_probe(mut self, probe: Arc<dyn ConnectivityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Use a custom config store.
    ///
    /// Default: [`FileStore`] under `<data_dir>/store`.
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_connectivity_config(mut self, config: ConnectivityConfig) -> Self {
        self.connectivity = config;
        self
    }

    pub fn with_bootstrap_settings(mut self, settings: BootstrapSettings) -> Self {
        self.bootstrap = settings;
        self
    }

    /// Shorthand for overriding the config service base URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.bootstrap.endpoint = endpoint.into();
        self
    }

    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join(PathsConfig::STORE_DIR_NAME)
    }

    /// Build the initializer. Nothing is started until
    /// [`AppInitializer::start`] is called.
    pub fn build(self) -> Result<AppInitializer> {
        let store_dir = self.store_dir();
        let probe = match self.probe {
            Some(probe) => probe,
            None => Arc::new(HttpProbe::new()?),
        };
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(FileStore::new(store_dir)));

        let monitor = Arc::new(ConnectivityMonitor::with_config(probe, self.connectivity));
        let client = Arc::new(ResilientClient::new(Arc::clone(&monitor))?);
        let bootstrap = Arc::new(ConfigBootstrap::with_settings(client, store, self.bootstrap));

        Ok(AppInitializer::new(monitor, bootstrap))
    }
}
