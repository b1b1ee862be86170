//! Sliding-window limiter for outbound notifications.
//!
//! The limiter guards the messaging endpoint, not the webhook: it is consulted
//! only for reports the deduplicator classified as fresh, and it counts every
//! admission against a single global window.

use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

/// The limiter's answer for one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The notification may be sent. Its instant has been recorded.
    Allowed,
    /// The window is full.
    Throttled {
        /// Time until the oldest admission leaves the window.
        retry_after: Duration,
    },
}

/// Admits at most `capacity` notifications within any `window`.
///
/// The window is half-open: an admission recorded at `t` stops counting at
/// exactly `t + window`.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: usize,
    window: Duration,
    admissions: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter allowing `capacity` admissions per `window`.
    pub fn new(capacity: usize, window: Duration) -> Self {
        Self { capacity, window, admissions: Mutex::new(VecDeque::with_capacity(capacity)) }
    }

    /// Maximum admissions per window.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Length of the sliding window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decides whether a notification may go out at `now`, recording it if so.
    pub fn admit(&self, now: Instant) -> Admission {
        let mut admissions = self.admissions.lock().unwrap_or_else(PoisonError::into_inner);
        self.prune(&mut admissions, now);

        if admissions.len() < self.capacity {
            admissions.push_back(now);
            return Admission::Allowed;
        }

        let retry_after = admissions
            .iter()
            .map(|admitted| {
                admitted
                    .checked_add(self.window)
                    .map_or(self.window, |expires| expires.saturating_duration_since(now))
            })
            .min()
            .unwrap_or(self.window);

        Admission::Throttled { retry_after }
    }

    /// Admissions still available at `now`.
    pub fn remaining(&self, now: Instant) -> usize {
        let mut admissions = self.admissions.lock().unwrap_or_else(PoisonError::into_inner);
        self.prune(&mut admissions, now);
        self.capacity.saturating_sub(admissions.len())
    }

    // Callers may race with slightly older `now` values, so the queue is not
    // assumed to be sorted.
    fn prune(&self, admissions: &mut VecDeque<Instant>, now: Instant) {
        admissions.retain(|admitted| now.saturating_duration_since(*admitted) < self.window);
    }
}
