//! Companion Core - offline-first startup for the Asistente Senior app.
//!
//! This crate keeps the app usable on flaky connections. It tracks
//! connectivity, runs HTTP requests with retry and backoff, and resolves the
//! app config from a local cache, a remote service, or built-in defaults.
//! It has no UI; hosts observe state through listeners and watch channels.
//!
//! # Example
//!
//! ```rust,ignore
//! use companion_core::AppInitializer;
//!
//! #[tokio::main]
//! async fn main() -> companion_core::Result<()> {
//!     let app = AppInitializer::builder("/path/to/data").build()?;
//!
//!     let state = app.start().await;
//!     println!("Startup finished: {}", state.phase);
//!
//!     let _subscription = app.monitor().subscribe(|status| {
//!         println!("Connectivity is now {}", status);
//!     });
//!
//!     if app.config().is_feature_enabled("voiceAssistant") {
//!         println!("Voice assistant on");
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod init;
pub mod models;
pub mod network;
pub mod storage;

pub(crate) mod sync;

// Re-export commonly used types
pub use bootstrap::{BootstrapSettings, ConfigBootstrap};
pub use error::{CompanionError, Result};
pub use init::{AppInitializer, AppInitializerBuilder};
pub use models::{AppConfig, AppInitState, InitPhase};
pub use network::{
    ConnectivityMonitor, ConnectivityProbe, ConnectivityStatus, FetchOptions, NetworkError,
    NetworkErrorKind, ResilientClient, Subscription,
};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
