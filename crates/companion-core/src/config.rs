//! Centralized configuration constants for the companion core.
//!
//! Runtime-tunable settings live on the builder structs of each component
//! (`RetryConfig`, `FetchOptions`, `ConnectivityConfig`, `BootstrapSettings`);
//! this module only holds the compiled-in defaults they start from.

use std::time::Duration;

/// Application identity.
pub struct AppInfo;

impl AppInfo {
    pub const APP_NAME: &'static str = "Asistente Senior";
    pub const APP_VERSION: &'static str = "1.0.2";
    /// `APP_NAME` without spaces, suffixed with `App`, then `/APP_VERSION`.
    pub const USER_AGENT: &'static str = "AsistenteSeniorApp/1.0.2";
}

/// Resilient fetch defaults.
pub struct NetworkDefaults;

impl NetworkDefaults {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    pub const MAX_RETRIES: u32 = 3;
    pub const BACKOFF_BASE_DELAY: Duration = Duration::from_millis(1000);
    pub const BACKOFF_MAX_DELAY: Duration = Duration::from_secs(60);
}

/// Connectivity monitor defaults.
pub struct ConnectivityDefaults;

impl ConnectivityDefaults {
    pub const PROBE_INTERVAL: Duration = Duration::from_secs(5);
    pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
    pub const PROBE_URLS: &'static [&'static str] = &[
        "https://clients3.google.com/generate_204",
        "https://api.manus.im",
    ];
}

/// Config bootstrap defaults.
pub struct ConfigDefaults;

impl ConfigDefaults {
    pub const CACHE_KEY: &'static str = "@asistente_senior_config_cache";
    pub const REMOTE_CONFIG_PATH: &'static str = "/api/config/app";
    /// Remote attempts beyond the first during bootstrap.
    pub const REMOTE_RETRIES: u32 = 0;
}

/// On-disk layout.
pub struct PathsConfig;

impl PathsConfig {
    pub const DATA_DIR_NAME: &'static str = "asistente-senior";
    pub const STORE_DIR_NAME: &'static str = "store";
}
