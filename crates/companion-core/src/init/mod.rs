//! App startup orchestration.
//!
//! [`AppInitializer`] starts the connectivity monitor, then resolves the
//! config, and publishes a single [`AppInitState`] that the UI can observe.

mod builder;

pub use builder::AppInitializerBuilder;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{error, info};

use crate::bootstrap::ConfigBootstrap;
use crate::config::AppInfo;
use crate::models::{AppConfig, AppInitState, InitPhase};
use crate::network::{ConnectivityMonitor, ConnectivityStatus, Subscription};
use crate::sync::lock;

/// Sequences monitor and config startup.
pub struct AppInitializer {
    monitor: Arc<ConnectivityMonitor>,
    bootstrap: Arc<ConfigBootstrap>,
    state: Arc<watch::Sender<AppInitState>>,
    subscription: Mutex<Option<Subscription>>,
    started: AtomicBool,
}

impl AppInitializer {
    pub fn new(monitor: Arc<ConnectivityMonitor>, bootstrap: Arc<ConfigBootstrap>) -> Self {
        let (state, _) = watch::channel(AppInitState::initializing(monitor.status()));
        Self {
            monitor,
            bootstrap,
            state: Arc::new(state),
            subscription: Mutex::new(None),
            started: AtomicBool::new(false),
        }
    }

    /// Builder that wires the default probe, store and client under `data_dir`.
    pub fn builder(data_dir: impl Into<PathBuf>) -> AppInitializerBuilder {
        AppInitializerBuilder::new(data_dir)
    }

    /// Run startup.
    ///
    /// Subscribes to connectivity changes, initializes the monitor, then
    /// resolves the config. Ends in `Ready`, or in `Error` with the failure
    /// message. Only the first call does work; later calls return the
    /// current state.
    pub async fn start(&self) -> AppInitState {
        if self.started.swap(true, Ordering::SeqCst) {
            return self.state();
        }

        let state = Arc::clone(&self.state);
        let subscription = self.monitor.subscribe(move |status: ConnectivityStatus| {
            state.send_if_modified(|s| {
                let changed = s.connectivity != status;
                s.connectivity = status;
                changed
            });
        });
        *lock(&self.subscription) = Some(subscription);

        info!("Initializing {} {}", AppInfo::APP_NAME, AppInfo::APP_VERSION);

        if let Err(e) = self.monitor.initialize().await {
            error!("App initialization failed: {}", e);
            self.state.send_modify(|s| {
                s.phase = InitPhase::Error;
                s.error = Some(e.to_string());
            });
            return self.state();
        }

        let config = self.bootstrap.initialize().await;
        self.state.send_modify(|s| {
            s.phase = InitPhase::Ready;
            s.error = None;
            s.config = Some(config);
        });

        info!(
            "App initialized ({}, {})",
            self.monitor.status(),
            self.bootstrap.get_config().app_version
        );
        self.state()
    }

    /// Current startup state.
    pub fn state(&self) -> AppInitState {
        self.state.borrow().clone()
    }

    /// Receiver for state updates, including later connectivity changes.
    pub fn watch(&self) -> watch::Receiver<AppInitState> {
        self.state.subscribe()
    }

    pub fn is_ready(&self) -> bool {
        self.state.borrow().is_ready()
    }

    pub fn is_online(&self) -> bool {
        self.state.borrow().is_online()
    }

    /// Config adopted at startup, falling back to the bootstrap's current one.
    pub fn config(&self) -> Arc<AppConfig> {
        let adopted = self.state.borrow().config.clone();
        adopted.unwrap_or_else(|| self.bootstrap.get_config())
    }

    pub fn monitor(&self) -> &Arc<ConnectivityMonitor> {
        &self.monitor
    }

    pub fn bootstrap(&self) -> &Arc<ConfigBootstrap> {
        &self.bootstrap
    }

    /// Drop the connectivity subscription and stop background work.
    pub fn shutdown(&self) {
        if let Some(subscription) = lock(&self.subscription).take() {
            subscription.unsubscribe();
        }
        self.monitor.shutdown();
        self.bootstrap.shutdown();
        info!("App shut down");
    }
}
