//! Error types for the companion core.
//!
//! `NetworkError` (see [`crate::network`]) is the user-facing classification of
//! HTTP failures; `CompanionError` is the crate-wide error that wraps it along
//! with storage and configuration failures.

use std::path::PathBuf;
use thiserror::Error;

use crate::network::NetworkError;

/// Main error type for the companion core.
#[derive(Debug, Error)]
pub enum CompanionError {
    // Network errors
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("Failed to create HTTP client: {message}")]
    HttpClient {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Connectivity probe failed: {message}")]
    Probe { message: String },

    #[error("Connectivity monitor has been shut down")]
    MonitorStopped,

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Storage errors
    #[error("Storage error for key {key}: {message}")]
    Storage { key: String, message: String },

    // Configuration errors
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },
}

/// Result type alias for companion operations.
pub type Result<T> = std::result::Result<T, CompanionError>;

impl From<std::io::Error> for CompanionError {
    fn from(err: std::io::Error) -> Self {
        CompanionError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for CompanionError {
    fn from(err: serde_json::Error) -> Self {
        CompanionError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl CompanionError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        CompanionError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Check if this error should trigger a retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            CompanionError::Network(e) => e.is_transient(),
            _ => false,
        }
    }
}
