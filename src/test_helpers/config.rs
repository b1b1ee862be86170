use std::time::Duration;

use crate::config::{AppConfig, HttpRetryConfig, JitterSetting};

/// Bot token used by test configurations.
pub const TEST_BOT_TOKEN: &str = "123456:test-token";

/// Chat id used by test configurations.
pub const TEST_CHAT_ID: &str = "-1001234567890";

/// Creates a configuration with the given webhook secret, deterministic
/// backoff and the default limits (30 notifications per 60 s, 300 s dedup
/// window).
pub fn create_test_config(secret: &str) -> AppConfig {
    AppConfig::builder()
        .webhook_secret(secret)
        .telegram(TEST_BOT_TOKEN, TEST_CHAT_ID)
        .retry(HttpRetryConfig {
            max_attempts: 4,
            initial_backoff_ms: Duration::from_millis(10),
            max_backoff_secs: Duration::from_secs(1),
            jitter: JitterSetting::None,
            ..Default::default()
        })
        .build()
}
