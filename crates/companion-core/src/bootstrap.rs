//! Application config bootstrap.
//!
//! Resolution order on first use:
//! 1. the cached config from the local store (a remote refresh then runs in
//!    the background),
//! 2. the remote config endpoint,
//! 3. the built-in default.
//!
//! Resolution never fails. The current config lives in a watch channel and is
//! replaced wholesale, so readers always see a complete document.

use serde_json::Value;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::{watch, OnceCell};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::{AppInfo, ConfigDefaults, NetworkDefaults};
use crate::error::{CompanionError, Result};
use crate::models::{AccessibilitySettings, AppConfig, NetworkSettings};
use crate::network::{FetchOptions, ResilientClient};
use crate::storage::KeyValueStore;
use crate::sync::lock;

/// Tunables for config resolution.
#[derive(Debug, Clone)]
pub struct BootstrapSettings {
    /// Base URL of the config service.
    pub endpoint: String,
    /// Per-attempt timeout for the remote fetch.
    pub timeout: Duration,
    /// Retries for the remote fetch on top of the first attempt.
    pub remote_retries: u32,
    /// Store key of the cached config.
    pub cache_key: String,
    /// Period of the background re-sync after resolution. Disabled when `None`.
    pub resync_interval: Option<Duration>,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            endpoint: AppConfig::default().api_endpoint,
            timeout: NetworkDefaults::REQUEST_TIMEOUT,
            remote_retries: ConfigDefaults::REMOTE_RETRIES,
            cache_key: ConfigDefaults::CACHE_KEY.to_string(),
            resync_interval: None,
        }
    }
}

impl BootstrapSettings {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_remote_retries(mut self, retries: u32) -> Self {
        self.remote_retries = retries;
        self
    }

    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = key.into();
        self
    }

    pub fn with_resync_interval(mut self, interval: Duration) -> Self {
        self.resync_interval = Some(interval);
        self
    }

    /// Full URL of the remote config document.
    pub fn remote_url(&self) -> Result<String> {
        let url = format!(
            "{}{}",
            self.endpoint.trim_end_matches('/'),
            ConfigDefaults::REMOTE_CONFIG_PATH
        );
        url::Url::parse(&url).map_err(|e| CompanionError::InvalidUrl {
            url: url.clone(),
            message: e.to_string(),
        })?;
        Ok(url)
    }
}

/// Where the initial config came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigSource {
    Cache,
    Remote,
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Cache => write!(f, "cache"),
            ConfigSource::Remote => write!(f, "remote"),
            ConfigSource::Default => write!(f, "default"),
        }
    }
}

/// Resolves and holds the application config.
pub struct ConfigBootstrap {
    client: Arc<ResilientClient>,
    store: Arc<dyn KeyValueStore>,
    settings: BootstrapSettings,
    default_config: Arc<AppConfig>,
    current: watch::Sender<Option<Arc<AppConfig>>>,
    init: OnceCell<Arc<AppConfig>>,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl ConfigBootstrap {
    pub fn new(client: Arc<ResilientClient>, store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_settings(client, store, BootstrapSettings::default())
    }

    pub fn with_settings(
        client: Arc<ResilientClient>,
        store: Arc<dyn KeyValueStore>,
        settings: BootstrapSettings,
    ) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            client,
            store,
            settings,
            default_config: Arc::new(AppConfig::default()),
            current,
            init: OnceCell::new(),
            background: Mutex::new(Vec::new()),
        }
    }

    pub fn settings(&self) -> &BootstrapSettings {
        &self.settings
    }

    /// Resolve the config, once.
    ///
    /// Concurrent and repeated callers share the first resolution and get the
    /// same config back.
    pub async fn initialize(self: &Arc<Self>) -> Arc<AppConfig> {
        self.init.get_or_init(|| self.resolve()).await.clone()
    }

    async fn resolve(self: &Arc<Self>) -> Arc<AppConfig> {
        let (config, source) = if let Some(cached) = self.load_cached().await {
            (Arc::new(cached), ConfigSource::Cache)
        } else {
            match self.fetch_remote().await {
                Ok(remote) => {
                    let remote = Arc::new(remote);
                    self.persist(&remote).await;
                    (remote, ConfigSource::Remote)
                }
                Err(e) => {
                    warn!("Remote config unavailable, using defaults: {}", e);
                    let fallback = Arc::clone(&self.default_config);
                    self.persist(&fallback).await;
                    (fallback, ConfigSource::Default)
                }
            }
        };

        info!(
            "Config resolved from {} (version {})",
            source, config.app_version
        );
        self.current.send_replace(Some(Arc::clone(&config)));

        if source == ConfigSource::Cache {
            self.spawn_background_refresh();
        }
        if let Some(period) = self.settings.resync_interval {
            self.spawn_resync(period);
        }

        config
    }

    /// Force a remote fetch.
    ///
    /// A valid remote config replaces the current one and the cache; on any
    /// failure the current config is returned unchanged.
    pub async fn refresh_config(&self) -> Arc<AppConfig> {
        match self.refresh_from_remote().await {
            Ok(config) => config,
            Err(e) => {
                warn!("Config refresh failed: {}", e);
                self.get_config()
            }
        }
    }

    async fn refresh_from_remote(&self) -> Result<Arc<AppConfig>> {
        let config = Arc::new(self.fetch_remote().await?);
        self.current.send_replace(Some(Arc::clone(&config)));
        self.persist(&config).await;
        info!("Config refreshed from remote (version {})", config.app_version);
        Ok(config)
    }

    async fn fetch_remote(&self) -> Result<AppConfig> {
        let url = self.settings.remote_url()?;
        let options = FetchOptions::new()
            .with_timeout(self.settings.timeout)
            .with_max_retries(self.settings.remote_retries)
            .with_header("Content-Type", "application/json")
            .with_header("User-Agent", AppInfo::USER_AGENT);

        let payload: Value = self.client.fetch_json(&url, &options).await?;
        AppConfig::from_value(payload)
    }

    async fn load_cached(&self) -> Option<AppConfig> {
        let raw = match self.store.get(&self.settings.cache_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No cached config");
                return None;
            }
            Err(e) => {
                warn!("Failed to read cached config: {}", e);
                return None;
            }
        };

        match AppConfig::from_json_str(&raw) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Ignoring invalid cached config: {}", e);
                None
            }
        }
    }

    async fn persist(&self, config: &AppConfig) {
        let result = match serde_json::to_string(config) {
            Ok(json) => self.store.set(&self.settings.cache_key, &json).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            warn!("Failed to cache config: {}", e);
        }
    }

    fn spawn_background_refresh(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let Some(bootstrap) = weak.upgrade() else {
                return;
            };
            if let Err(e) = bootstrap.refresh_from_remote().await {
                debug!("Background config refresh failed: {}", e);
            }
        });
        lock(&self.background).push(handle);
    }

    fn spawn_resync(self: &Arc<Self>, period: Duration) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(bootstrap) = weak.upgrade() else {
                    break;
                };
                if let Err(e) = bootstrap.refresh_from_remote().await {
                    debug!("Periodic config re-sync failed: {}", e);
                }
            }
        });
        lock(&self.background).push(handle);
    }

    /// Current config, or the built-in default before resolution.
    pub fn get_config(&self) -> Arc<AppConfig> {
        match self.current.borrow().as_ref() {
            Some(config) => Arc::clone(config),
            None => {
                warn!("Config requested before initialization, using defaults");
                Arc::clone(&self.default_config)
            }
        }
    }

    pub fn is_feature_enabled(&self, feature: &str) -> bool {
        self.get_config().is_feature_enabled(feature)
    }

    pub fn system_prompt(&self) -> String {
        self.get_config().system_prompt.clone()
    }

    pub fn api_endpoint(&self) -> String {
        self.get_config().api_endpoint.clone()
    }

    pub fn accessibility_settings(&self) -> AccessibilitySettings {
        self.get_config().accessibility.clone()
    }

    pub fn network_settings(&self) -> NetworkSettings {
        self.get_config().network.clone()
    }

    /// Whether the initial resolution has completed.
    pub fn is_ready(&self) -> bool {
        self.init.initialized()
    }

    /// Receiver that observes every config replacement.
    pub fn watch(&self) -> watch::Receiver<Option<Arc<AppConfig>>> {
        self.current.subscribe()
    }

    /// Abort background refresh and re-sync tasks.
    pub fn shutdown(&self) {
        for handle in lock(&self.background).drain(..) {
            handle.abort();
        }
    }
}

impl Drop for ConfigBootstrap {
    fn drop(&mut self) {
        self.shutdown();
    }
}
