//! Retry bookkeeping for user-triggered network actions.
//!
//! A screen that issues a request holds one tracker: failures are recorded
//! with [`NetworkErrorTracker::set_error`], and the "retry" button runs the
//! action again through [`NetworkErrorTracker::retry`].

use std::future::Future;
use std::sync::Mutex;
use tracing::debug;

use crate::network::error::NetworkError;
use crate::sync::lock;

/// Snapshot of a tracker.
#[derive(Debug, Clone, Default)]
pub struct NetworkErrorState {
    pub error: Option<NetworkError>,
    pub is_retrying: bool,
    /// Consecutive failed retries since the last success.
    pub retry_count: u32,
}

#[derive(Debug, Default)]
pub struct NetworkErrorTracker {
    state: Mutex<NetworkErrorState>,
}

impl NetworkErrorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> NetworkErrorState {
        lock(&self.state).clone()
    }

    pub fn set_error(&self, error: Option<NetworkError>) {
        lock(&self.state).error = error;
    }

    pub fn clear_error(&self) {
        lock(&self.state).error = None;
    }

    /// Run `operation` as a retry of the failed action.
    ///
    /// Success clears the error and resets the count; failure records the new
    /// error and bumps the count.
    pub async fn retry<F, Fut, T>(&self, operation: F) -> Result<T, NetworkError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, NetworkError>>,
    {
        lock(&self.state).is_retrying = true;

        let result = operation().await;

        let mut state = lock(&self.state);
        state.is_retrying = false;
        match &result {
            Ok(_) => {
                state.error = None;
                state.retry_count = 0;
            }
            Err(e) => {
                state.error = Some(e.clone());
                state.retry_count += 1;
                debug!("Retry {} failed: {}", state.retry_count, e);
            }
        }
        drop(state);

        result
    }

    /// User-facing message for the current error, empty when there is none.
    pub fn error_message(&self) -> String {
        lock(&self.state)
            .error
            .as_ref()
            .map(NetworkError::user_message)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkErrorKind;

    #[tokio::test]
    async fn test_failed_retries_accumulate() {
        let tracker = NetworkErrorTracker::new();
        tracker.set_error(Some(NetworkError::no_connection()));

        for _ in 0..2 {
            let result = tracker
                .retry(|| async { Err::<(), _>(NetworkError::server_error(503)) })
                .await;
            assert!(result.is_err());
        }

        let state = tracker.state();
        assert_eq!(state.retry_count, 2);
        assert!(!state.is_retrying);
        assert_eq!(
            state.error.map(|e| e.kind),
            Some(NetworkErrorKind::ServerError)
        );
        assert_eq!(
            tracker.error_message(),
            "Server error (503). Please try again later."
        );
    }

    #[tokio::test]
    async fn test_successful_retry_resets() {
        let tracker = NetworkErrorTracker::new();
        let _ = tracker
            .retry(|| async { Err::<u8, _>(NetworkError::no_connection()) })
            .await;

        let value = tracker.retry(|| async { Ok::<_, NetworkError>(9u8) }).await;
        assert_eq!(value.unwrap(), 9);

        let state = tracker.state();
        assert!(state.error.is_none());
        assert_eq!(state.retry_count, 0);
        assert_eq!(tracker.error_message(), "");
    }

    #[tokio::test]
    async fn test_retrying_flag_visible_during_operation() {
        let tracker = NetworkErrorTracker::new();
        let seen = tracker
            .retry(|| async { Ok::<_, NetworkError>(tracker.state().is_retrying) })
            .await
            .unwrap();
        assert!(seen);
    }

    #[test]
    fn test_clear_error_keeps_count() {
        let tracker = NetworkErrorTracker::new();
        tracker.set_error(Some(NetworkError::no_connection()));
        tracker.clear_error();
        assert!(tracker.state().error.is_none());
        assert_eq!(tracker.state().retry_count, 0);
    }
}
