//! This module provides the outbound HTTP client used to reach the messaging
//! endpoint.

mod client;

pub use client::{HttpClientError, create_http_client};
