use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{
    deserialize_duration_from_ms, deserialize_duration_from_seconds, serialize_duration_to_ms,
    serialize_duration_to_seconds,
};

/// --- Default values for retry configuration settings ---
fn default_max_attempts() -> u32 {
    4
}

fn default_initial_backoff_ms() -> Duration {
    Duration::from_millis(500)
}

fn default_max_backoff_secs() -> Duration {
    Duration::from_secs(10)
}

fn default_base_for_backoff() -> u32 {
    2
}

/// Serializable setting for jitter in retry policies
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JitterSetting {
    /// No jitter applied to the backoff duration
    None,
    /// Full jitter applied, randomizing the backoff duration
    #[default]
    Full,
}

/// Retry policy for notification delivery
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct HttpRetryConfig {
    /// Total number of attempts for one message, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base for exponential backoff calculations
    #[serde(default = "default_base_for_backoff")]
    pub base_for_backoff: u32,
    /// Backoff before the first retry
    #[serde(
        default = "default_initial_backoff_ms",
        deserialize_with = "deserialize_duration_from_ms",
        serialize_with = "serialize_duration_to_ms"
    )]
    pub initial_backoff_ms: Duration,
    /// Upper bound for a single backoff
    #[serde(
        default = "default_max_backoff_secs",
        deserialize_with = "deserialize_duration_from_seconds",
        serialize_with = "serialize_duration_to_seconds"
    )]
    pub max_backoff_secs: Duration,
    /// Jitter to apply to the backoff duration
    #[serde(default)]
    pub jitter: JitterSetting,
}

impl HttpRetryConfig {
    /// Backoff to wait after the given failed attempt (1-based).
    ///
    /// The un-jittered delay is `initial * base^(attempt - 1)`, capped at
    /// `max_backoff_secs`. Full jitter picks uniformly in `[0, delay]`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.base_for_backoff.max(1).saturating_pow(exponent);
        let delay = self.initial_backoff_ms.saturating_mul(factor).min(self.max_backoff_secs);

        match self.jitter {
            JitterSetting::None => delay,
            JitterSetting::Full => {
                let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                Duration::from_millis(rand::thread_rng().gen_range(0..=millis))
            }
        }
    }
}

impl Default for HttpRetryConfig {
    /// Creates a default configuration with reasonable retry settings
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_for_backoff: default_base_for_backoff(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_secs: default_max_backoff_secs(),
            jitter: JitterSetting::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> HttpRetryConfig {
        HttpRetryConfig { jitter: JitterSetting::None, ..Default::default() }
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        let config = no_jitter();
        assert_eq!(config.backoff_for(1), Duration::from_millis(500));
        assert_eq!(config.backoff_for(2), Duration::from_millis(1000));
        assert_eq!(config.backoff_for(3), Duration::from_millis(2000));
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = no_jitter();
        assert_eq!(config.backoff_for(10), Duration::from_secs(10));
        assert_eq!(config.backoff_for(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn test_full_jitter_stays_within_bounds() {
        let config = HttpRetryConfig::default();
        for attempt in 1..6 {
            let upper = no_jitter().backoff_for(attempt);
            assert!(config.backoff_for(attempt) <= upper);
        }
    }

    #[test]
    fn test_deserialize_partial_config_uses_defaults() {
        let json = r#"{ "max_attempts": 2, "initial_backoff_ms": 100, "jitter": "none" }"#;
        let config: HttpRetryConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.initial_backoff_ms, Duration::from_millis(100));
        assert_eq!(config.max_backoff_secs, Duration::from_secs(10));
        assert_eq!(config.jitter, JitterSetting::None);
        assert_eq!(config.base_for_backoff, 2);
    }
}
