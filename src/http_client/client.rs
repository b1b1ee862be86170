//! Builds the shared outbound HTTP client.
//!
//! Retries are driven by the delivery loop rather than by middleware, so that
//! backoff can be cancelled on shutdown and observed in tests. The client only
//! carries connection pooling and timeouts.

use reqwest::Client as ReqwestClient;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use thiserror::Error;

use crate::config::BaseHttpClientConfig;

/// Errors that can occur while building the HTTP client.
#[derive(Debug, Error)]
pub enum HttpClientError {
    /// An error occurred while building the underlying `reqwest::Client`.
    #[error("Failed to create HTTP client: {0}")]
    HttpClientBuildError(String),
}

/// Creates an HTTP client with pooling and timeouts taken from `config`.
///
/// # Parameters:
/// - `config`: Pool and timeout settings
///
/// # Returns
/// A `ClientWithMiddleware` whose every request is bounded by
/// `config.request_timeout`
pub fn create_http_client(
    config: &BaseHttpClientConfig,
) -> Result<ClientWithMiddleware, HttpClientError> {
    let base_client = ReqwestClient::builder()
        .pool_max_idle_per_host(config.max_idle_per_host)
        .pool_idle_timeout(Some(config.idle_timeout))
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| HttpClientError::HttpClientBuildError(e.to_string()))?;

    Ok(ClientBuilder::new(base_client).build())
}
