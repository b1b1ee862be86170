//! Time source used by the pipeline.

use std::time::Instant;

/// Provides the current time to the rate limiter and deduplicator.
///
/// Tests inject a manual clock to step through windows without sleeping.
pub trait Clock: Send + Sync {
    /// Monotonic time used for window arithmetic.
    fn now(&self) -> Instant;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
