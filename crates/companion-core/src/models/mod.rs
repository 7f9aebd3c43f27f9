//! Data models shared with the mobile client.
//!
//! These types mirror the JSON documents the app exchanges with the config
//! endpoint and persists in its local cache.

mod app_config;
mod init_state;

pub use app_config::*;
pub use init_state::*;
