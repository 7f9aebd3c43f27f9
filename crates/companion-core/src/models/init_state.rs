//! Startup readiness state published by the app initializer.

use serde::Serialize;
use std::sync::Arc;

use super::AppConfig;
use crate::network::ConnectivityStatus;

/// Startup phase. `Ready` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InitPhase {
    Initializing,
    Ready,
    Error,
}

impl std::fmt::Display for InitPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InitPhase::Initializing => write!(f, "initializing"),
            InitPhase::Ready => write!(f, "ready"),
            InitPhase::Error => write!(f, "error"),
        }
    }
}

/// Snapshot of the app's startup state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInitState {
    pub phase: InitPhase,
    /// Message of the failure that moved the app into `Error`.
    pub error: Option<String>,
    /// Config adopted during startup, if startup got that far.
    pub config: Option<Arc<AppConfig>>,
    /// Live connectivity, kept current after startup completes.
    pub connectivity: ConnectivityStatus,
}

impl AppInitState {
    pub fn initializing(connectivity: ConnectivityStatus) -> Self {
        Self {
            phase: InitPhase::Initializing,
            error: None,
            config: None,
            connectivity,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.phase == InitPhase::Ready
    }

    pub fn is_online(&self) -> bool {
        self.connectivity == ConnectivityStatus::Online
    }
}
