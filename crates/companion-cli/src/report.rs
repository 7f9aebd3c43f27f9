//! JSON summary printed after startup.

use companion_core::models::{AppConfig, InitPhase};
use companion_core::network::{ConnectivityStatus, MonitorSnapshot, StatusBanner};
use companion_core::AppInitializer;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Startup outcome as seen by the host.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupReport {
    pub phase: InitPhase,
    pub error: Option<String>,
    pub connectivity: ConnectivityStatus,
    /// Connectivity bar content, absent while online.
    pub banner: Option<StatusBanner>,
    pub config_ready: bool,
    pub config: Arc<AppConfig>,
    pub monitor: MonitorSnapshot,
    pub data_dir: PathBuf,
}

impl StartupReport {
    pub fn collect(app: &AppInitializer, data_dir: &Path) -> Self {
        let state = app.state();
        Self {
            phase: state.phase,
            error: state.error,
            connectivity: state.connectivity,
            banner: StatusBanner::for_status(state.connectivity),
            config_ready: app.bootstrap().is_ready(),
            // Reflects a forced refresh, unlike the config adopted at startup.
            config: app.bootstrap().get_config(),
            monitor: app.monitor().snapshot(),
            data_dir: data_dir.to_path_buf(),
        }
    }
}
