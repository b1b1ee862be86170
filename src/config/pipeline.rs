//! Settings for the rate limiter, deduplicator and message formatter.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{deserialize_duration_from_seconds, serialize_duration_to_seconds};

fn default_max_notifications() -> usize {
    30
}

fn default_rate_window() -> Duration {
    Duration::from_secs(60)
}

fn default_dedup_window() -> Duration {
    Duration::from_secs(300)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_max_message_chars() -> usize {
    4096
}

fn default_max_stacktrace_chars() -> usize {
    2000
}

fn default_max_metadata_chars() -> usize {
    1000
}

fn default_max_metadata_entries() -> usize {
    20
}

/// Outbound notification budget.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Notifications allowed per window.
    #[serde(default = "default_max_notifications")]
    pub max_notifications: usize,

    /// Length of the sliding window.
    #[serde(
        default = "default_rate_window",
        deserialize_with = "deserialize_duration_from_seconds",
        serialize_with = "serialize_duration_to_seconds"
    )]
    pub window_secs: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { max_notifications: default_max_notifications(), window_secs: default_rate_window() }
    }
}

/// Duplicate suppression settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct DedupConfig {
    /// Repeats of a fingerprint within this window are suppressed.
    #[serde(
        default = "default_dedup_window",
        deserialize_with = "deserialize_duration_from_seconds",
        serialize_with = "serialize_duration_to_seconds"
    )]
    pub window_secs: Duration,

    /// How often expired fingerprints are swept from memory.
    #[serde(
        default = "default_sweep_interval",
        deserialize_with = "deserialize_duration_from_seconds",
        serialize_with = "serialize_duration_to_seconds"
    )]
    pub sweep_interval_secs: Duration,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self { window_secs: default_dedup_window(), sweep_interval_secs: default_sweep_interval() }
    }
}

/// Size limits applied when rendering a notification.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct FormattingConfig {
    /// Hard cap of the messaging endpoint.
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    /// Stack traces are truncated to this many rendered (HTML escaped)
    /// characters.
    #[serde(default = "default_max_stacktrace_chars")]
    pub max_stacktrace_chars: usize,

    /// The metadata block is truncated to this many rendered characters.
    #[serde(default = "default_max_metadata_chars")]
    pub max_metadata_chars: usize,

    /// Only this many metadata entries are rendered.
    #[serde(default = "default_max_metadata_entries")]
    pub max_metadata_entries: usize,
}

impl Default for FormattingConfig {
    fn default() -> Self {
        Self {
            max_message_chars: default_max_message_chars(),
            max_stacktrace_chars: default_max_stacktrace_chars(),
            max_metadata_chars: default_max_metadata_chars(),
            max_metadata_entries: default_max_metadata_entries(),
        }
    }
}
