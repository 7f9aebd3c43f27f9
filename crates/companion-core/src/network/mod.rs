//! Network layer: connectivity tracking, classified errors, and resilient
//! HTTP fetches.
//!
//! This module provides:
//! - Connectivity monitoring with replay-on-subscribe listeners
//! - Pluggable connectivity probes (HTTP, host flag)
//! - Retry logic with exponential backoff
//! - An HTTP client that gates on connectivity and classifies failures
//! - Retry bookkeeping for user-triggered actions

mod client;
mod error;
mod error_state;
mod monitor;
mod probe;
mod retry;
mod status;

pub use client::{extract_domain, FetchOptions, ResilientClient};
pub use error::{ErrorCause, NetworkError, NetworkErrorKind};
pub use error_state::{NetworkErrorState, NetworkErrorTracker};
pub use monitor::{ConnectivityConfig, ConnectivityMonitor, MonitorSnapshot, Subscription};
pub use probe::{ConnectivityProbe, FlagProbe, HttpProbe};
pub use retry::{retry_async, RetryConfig, RetryStats};
pub use status::{ConnectivityStatus, StatusBanner};
