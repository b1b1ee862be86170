//! Error types for the notification service.

use thiserror::Error;

use crate::http_client::HttpClientError;

/// Why a single delivery attempt failed, classified by whether retrying can
/// help.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// Network error, timeout, 5xx, 408 or 429. Worth retrying.
    #[error("Transient delivery failure: {0}")]
    Transient(String),

    /// The endpoint refused the message or the request itself is broken.
    #[error("Permanent delivery failure: {0}")]
    Permanent(String),
}

impl DeliveryError {
    /// Whether the attempt may succeed if repeated.
    pub fn is_transient(&self) -> bool {
        matches!(self, DeliveryError::Transient(_))
    }
}

/// Defines the possible errors that can occur while setting up the
/// notification service.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// An error related to invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error originating from building the HTTP client.
    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] HttpClientError),
}
