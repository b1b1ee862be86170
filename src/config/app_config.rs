use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use super::{
    BaseHttpClientConfig, DedupConfig, FormattingConfig, HttpRetryConfig, RateLimitConfig,
    ServerConfig, TelegramConfig, deserialize_duration_from_seconds,
};

/// Provides the default value for shutdown_timeout.
fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Upper bound for every configured window and interval.
pub const MAX_WINDOW: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Application configuration for fault-relay.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Webhook server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Downstream Telegram chat.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Outbound notification budget.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Duplicate suppression.
    #[serde(default)]
    pub dedup: DedupConfig,

    /// Retry policy for notification delivery.
    #[serde(default)]
    pub http_retry_config: HttpRetryConfig,

    /// Configuration for the base HTTP client.
    #[serde(default)]
    pub http_base_config: BaseHttpClientConfig,

    /// Notification size limits.
    #[serde(default)]
    pub formatting: FormattingConfig,

    /// The maximum time in seconds to wait for graceful shutdown.
    #[serde(
        deserialize_with = "deserialize_duration_from_seconds",
        default = "default_shutdown_timeout"
    )]
    pub shutdown_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            telegram: TelegramConfig::default(),
            rate_limit: RateLimitConfig::default(),
            dedup: DedupConfig::default(),
            http_retry_config: HttpRetryConfig::default(),
            http_base_config: BaseHttpClientConfig::default(),
            formatting: FormattingConfig::default(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

impl AppConfig {
    /// Creates a new `AppConfig` by reading `app.yaml` from the configuration
    /// directory (if present) and layering `FAULT_RELAY__*` environment
    /// variables on top.
    pub fn new(config_dir: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir_str = config_dir.unwrap_or("configs");
        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/app.yaml", config_dir_str)).required(false))
            .add_source(Environment::with_prefix("FAULT_RELAY").separator("__"))
            .build()?;
        s.try_deserialize()
    }

    /// Checks that the Telegram credentials are present.
    pub fn validate_telegram(&self) -> Result<(), ConfigError> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(ConfigError::Message("telegram.bot_token is not set".into()));
        }
        if self.telegram.chat_id.trim().is_empty() {
            return Err(ConfigError::Message("telegram.chat_id is not set".into()));
        }
        Ok(())
    }

    /// Checks everything the webhook server needs to start.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_telegram()?;
        match self.server.webhook_secret.as_deref() {
            Some(secret) if !secret.is_empty() => {}
            _ => {
                return Err(ConfigError::Message(
                    "server.webhook_secret is not set (or FAULT_RELAY_WEBHOOK_SECRET)".into(),
                ));
            }
        }
        if self.rate_limit.max_notifications == 0 {
            return Err(ConfigError::Message("rate_limit.max_notifications must be > 0".into()));
        }
        if self.http_retry_config.max_attempts == 0 {
            return Err(ConfigError::Message("http_retry_config.max_attempts must be > 0".into()));
        }
        for (name, window) in [
            ("rate_limit.window_secs", self.rate_limit.window_secs),
            ("dedup.window_secs", self.dedup.window_secs),
            ("dedup.sweep_interval_secs", self.dedup.sweep_interval_secs),
        ] {
            if window > MAX_WINDOW {
                return Err(ConfigError::Message(format!(
                    "{name} must not exceed {} seconds",
                    MAX_WINDOW.as_secs()
                )));
            }
        }
        Ok(())
    }

    /// Creates a new `AppConfigBuilder`, used by tests and fixtures.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

/// A builder for creating `AppConfig` instances in tests.
#[derive(Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Sets the shared webhook secret.
    pub fn webhook_secret(mut self, secret: &str) -> Self {
        self.config.server.webhook_secret = Some(secret.to_string());
        self
    }

    /// Sets the bot token and chat id.
    pub fn telegram(mut self, bot_token: &str, chat_id: &str) -> Self {
        self.config.telegram.bot_token = bot_token.to_string();
        self.config.telegram.chat_id = chat_id.to_string();
        self
    }

    /// Points the Telegram client at another base URL.
    pub fn telegram_api_base_url(mut self, url: &str) -> Self {
        self.config.telegram.api_base_url = url.to_string();
        self
    }

    /// Sets the rate limit.
    pub fn rate_limit(mut self, max_notifications: usize, window: Duration) -> Self {
        self.config.rate_limit = RateLimitConfig { max_notifications, window_secs: window };
        self
    }

    /// Sets the dedup window.
    pub fn dedup_window(mut self, window: Duration) -> Self {
        self.config.dedup.window_secs = window;
        self
    }

    /// Replaces the retry policy.
    pub fn retry(mut self, retry: HttpRetryConfig) -> Self {
        self.config.http_retry_config = retry;
        self
    }

    /// Replaces the formatting limits.
    pub fn formatting(mut self, formatting: FormattingConfig) -> Self {
        self.config.formatting = formatting;
        self
    }

    /// Finishes the builder.
    pub fn build(self) -> AppConfig {
        self.config
    }
}
