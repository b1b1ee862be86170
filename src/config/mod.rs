//! Configuration module for fault-relay.

mod app_config;
mod helpers;
mod http_base;
mod http_retry;
mod pipeline;
mod server;
mod telegram;

pub use app_config::{AppConfig, AppConfigBuilder};
pub use helpers::{
    deserialize_duration_from_ms, deserialize_duration_from_seconds, serialize_duration_to_ms,
    serialize_duration_to_seconds,
};
pub use http_base::BaseHttpClientConfig;
pub use http_retry::{HttpRetryConfig, JitterSetting};
pub use pipeline::{DedupConfig, FormattingConfig, RateLimitConfig};
pub use server::ServerConfig;
pub use telegram::TelegramConfig;
