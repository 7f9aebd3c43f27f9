//! Classified network errors.
//!
//! Every failure surfaced by the resilient fetch layer is normalized into a
//! [`NetworkError`] exactly once; already-classified errors pass through the
//! classifier untouched.

use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// Shared, cloneable error cause.
pub type ErrorCause = Arc<dyn StdError + Send + Sync + 'static>;

/// Classification of a network failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkErrorKind {
    Timeout,
    NoConnection,
    ServerError,
    ParseError,
    Unknown,
}

impl std::fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkErrorKind::Timeout => write!(f, "timeout"),
            NetworkErrorKind::NoConnection => write!(f, "no_connection"),
            NetworkErrorKind::ServerError => write!(f, "server_error"),
            NetworkErrorKind::ParseError => write!(f, "parse_error"),
            NetworkErrorKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// A classified network failure.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct NetworkError {
    pub kind: NetworkErrorKind,
    pub message: String,
    /// HTTP status for `ServerError`.
    pub status_code: Option<u16>,
    #[source]
    pub cause: Option<ErrorCause>,
}

impl NetworkError {
    pub fn new(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            cause: None,
        }
    }

    /// Attach the underlying error for diagnostics.
    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub fn no_connection() -> Self {
        Self::new(NetworkErrorKind::NoConnection, "No internet connection")
    }

    pub fn timeout(after: std::time::Duration) -> Self {
        Self::new(
            NetworkErrorKind::Timeout,
            format!("Request timed out after {:?}", after),
        )
    }

    pub fn server_error(status: u16) -> Self {
        Self {
            status_code: Some(status),
            ..Self::new(
                NetworkErrorKind::ServerError,
                format!("Server responded with status {}", status),
            )
        }
    }

    /// Classify a transport error raised by reqwest.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            NetworkErrorKind::Timeout
        } else if err.is_decode() {
            NetworkErrorKind::ParseError
        } else if err.is_connect() || err.is_request() {
            NetworkErrorKind::NoConnection
        } else if let Some(status) = err.status() {
            return Self::server_error(status.as_u16()).with_cause(err);
        } else {
            NetworkErrorKind::Unknown
        };

        let message = match kind {
            NetworkErrorKind::Timeout => "The request took too long".to_string(),
            NetworkErrorKind::ParseError => "Failed to process the response".to_string(),
            NetworkErrorKind::NoConnection => "Could not reach the server".to_string(),
            _ => err.to_string(),
        };
        Self::new(kind, message).with_cause(err)
    }

    /// Classify a body decode failure.
    pub fn from_parse(err: serde_json::Error) -> Self {
        Self::new(NetworkErrorKind::ParseError, "Failed to process the response").with_cause(err)
    }

    /// Transient errors are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            NetworkErrorKind::Timeout | NetworkErrorKind::NoConnection
        )
    }

    /// Human-readable message for the UI layer.
    pub fn user_message(&self) -> String {
        match self.kind {
            NetworkErrorKind::NoConnection => "No connection. Trying to reconnect...".to_string(),
            NetworkErrorKind::Timeout => {
                "The connection took too long. Please try again.".to_string()
            }
            NetworkErrorKind::ServerError => match self.status_code {
                Some(code) => format!("Server error ({}). Please try again later.", code),
                None => "Server error. Please try again later.".to_string(),
            },
            NetworkErrorKind::ParseError => {
                "Could not process the response. Please try again.".to_string()
            }
            NetworkErrorKind::Unknown => "Connection error. Please try again.".to_string(),
        }
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        NetworkError::from_reqwest(err)
    }
}

impl From<serde_json::Error> for NetworkError {
    fn from(err: serde_json::Error) -> Self {
        NetworkError::from_parse(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_transient_kinds() {
        assert!(NetworkError::no_connection().is_transient());
        assert!(NetworkError::timeout(std::time::Duration::from_secs(1)).is_transient());
        assert!(!NetworkError::server_error(500).is_transient());
        assert!(!NetworkError::new(NetworkErrorKind::ParseError, "x").is_transient());
        assert!(!NetworkError::new(NetworkErrorKind::Unknown, "x").is_transient());
    }

    #[test]
    fn test_server_error_carries_status() {
        let err = NetworkError::server_error(502);
        assert_eq!(err.kind, NetworkErrorKind::ServerError);
        assert_eq!(err.status_code, Some(502));
        assert_eq!(
            err.user_message(),
            "Server error (502). Please try again later."
        );
    }

    #[test]
    fn test_parse_error_preserves_cause() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = NetworkError::from(json_err);
        assert_eq!(err.kind, NetworkErrorKind::ParseError);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_display_includes_kind() {
        let err = NetworkError::no_connection();
        assert_eq!(err.to_string(), "no_connection: No internet connection");
    }

    #[test]
    fn test_clone_shares_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err = NetworkError::new(NetworkErrorKind::Unknown, "boom").with_cause(io);
        let cloned = err.clone();
        assert!(Arc::ptr_eq(
            err.cause.as_ref().unwrap(),
            cloned.cause.as_ref().unwrap()
        ));
    }
}
