//! HTTP client with connectivity gating, timeouts and retries.
//!
//! Every attempt first consults the [`ConnectivityMonitor`]; while the device
//! is not online the attempt fails with `no_connection` without touching the
//! network. Per-attempt timeouts drop the in-flight request future, which
//! closes the connection and releases the timer together.

use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::{AppInfo, NetworkDefaults};
use crate::error::{CompanionError, Result};
use crate::models::NetworkSettings;
use crate::network::error::NetworkError;
use crate::network::monitor::ConnectivityMonitor;
use crate::network::retry::{retry_async, RetryConfig, RetryStats};

/// Per-call request options.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    /// Bound on a single attempt, from sending to the end of the body.
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: Vec::new(),
            body: None,
            timeout: NetworkDefaults::REQUEST_TIMEOUT,
            retry: RetryConfig::default(),
        }
    }
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options derived from the network section of the app config.
    pub fn from_settings(settings: &NetworkSettings) -> Self {
        Self {
            timeout: Duration::from_millis(settings.timeout_ms),
            retry: RetryConfig::default()
                .with_max_retries(settings.retry_attempts)
                .with_base_delay(Duration::from_millis(settings.retry_delay_ms)),
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Serialize `body` as JSON and set the matching content type.
    pub fn with_json_body<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self.with_header("Content-Type", "application/json"))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.retry.max_retries = retries;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// HTTP client that retries transient failures and classifies errors.
pub struct ResilientClient {
    client: Client,
    monitor: Arc<ConnectivityMonitor>,
}

impl ResilientClient {
    pub fn new(monitor: Arc<ConnectivityMonitor>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(AppInfo::USER_AGENT)
            .build()
            .map_err(|e| CompanionError::HttpClient {
                message: e.to_string(),
                source: Some(e),
            })?;

        Ok(Self::with_client(client, monitor))
    }

    pub fn with_client(client: Client, monitor: Arc<ConnectivityMonitor>) -> Self {
        Self { client, monitor }
    }

    pub fn monitor(&self) -> &Arc<ConnectivityMonitor> {
        &self.monitor
    }

    /// Fetch `url`, retrying `timeout` and `no_connection` failures with
    /// exponential backoff.
    pub async fn fetch_with_retry(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> std::result::Result<Response, NetworkError> {
        self.fetch_with_stats(url, options).await.0
    }

    /// Like [`fetch_with_retry`](Self::fetch_with_retry), also returning the
    /// retry statistics.
    pub async fn fetch_with_stats(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> (std::result::Result<Response, NetworkError>, RetryStats) {
        retry_async(
            &options.retry,
            move |attempt| {
                debug!("{} {} (attempt {})", options.method, url, attempt + 1);
                self.attempt(url, options)
            },
            NetworkError::is_transient,
        )
        .await
    }

    /// Fetch `url` and decode the JSON body.
    ///
    /// Retries cover the request only; a body that fails to decode is a
    /// `parse_error` and is not retried.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> std::result::Result<T, NetworkError> {
        let response = self.fetch_with_retry(url, options).await?;
        let body = tokio::time::timeout(options.timeout, response.bytes())
            .await
            .map_err(|_| NetworkError::timeout(options.timeout))?
            .map_err(NetworkError::from_reqwest)?;
        serde_json::from_slice(&body).map_err(NetworkError::from_parse)
    }

    async fn attempt(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> std::result::Result<Response, NetworkError> {
        if !self.monitor.is_online() {
            debug!(
                "Skipping request to {} while {}",
                extract_domain(url),
                self.monitor.status()
            );
            return Err(NetworkError::no_connection());
        }

        let mut request = self.client.request(options.method.clone(), url);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &options.body {
            request = request.body(body.clone());
        }

        let response = tokio::time::timeout(options.timeout, request.send())
            .await
            .map_err(|_| NetworkError::timeout(options.timeout))?
            .map_err(NetworkError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            debug!("{} answered {}", extract_domain(url), status);
            return Err(NetworkError::server_error(status.as_u16()));
        }
        Ok(response)
    }
}

/// Extract the host from a URL, for logging.
pub fn extract_domain(url: &str) -> String {
    url::Url::parse(url)
        .map(|u| u.host_str().unwrap_or("unknown").to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}
