//! Fingerprint-based suppression of repeated errors.
//!
//! A burst of one underlying fault should produce a single notification per
//! dedup window. The [`Deduplicator`] keeps one [`DedupEntry`] per
//! [`Fingerprint`] and decides, for every occurrence, whether it is fresh
//! (notify) or a repeat (count and drop).

use std::{
    fmt,
    time::{Duration, Instant},
};

use dashmap::{DashMap, mapref::entry::Entry};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::models::ErrorReport;

/// Separates the hashed fields so that `("ab", "c")` and `("a", "bc")` differ.
const FIELD_SEPARATOR: u8 = 0x1f;

/// A key identifying "the same error".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wraps an existing key verbatim.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The caller-supplied fingerprint if it is non-empty, otherwise one
    /// derived from the error type, message and file name.
    pub fn for_report(report: &ErrorReport) -> Self {
        match report.fingerprint.as_deref() {
            Some(supplied) if !supplied.is_empty() => Self::new(supplied),
            _ => Self::derive(
                report.error_type.as_deref(),
                &report.error_message,
                report.file_name.as_deref(),
            ),
        }
    }

    /// Derives a fingerprint from the fields that identify a fault.
    ///
    /// Timestamps, traces and metadata are deliberately not part of the key.
    pub fn derive(error_type: Option<&str>, message: &str, file_name: Option<&str>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(error_type.unwrap_or_default().as_bytes());
        hasher.update([FIELD_SEPARATOR]);
        hasher.update(message.as_bytes());
        hasher.update([FIELD_SEPARATOR]);
        hasher.update(file_name.unwrap_or_default().as_bytes());
        let digest = hasher.finalize();
        Self(hex::encode(&digest[..16]))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-fingerprint suppression state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupEntry {
    /// First time this fingerprint was observed.
    pub first_seen: Instant,
    /// Most recent occurrence.
    pub last_seen: Instant,
    /// Last time an occurrence was let through. `None` once a claim has been
    /// released without a notification going out.
    pub last_notified: Option<Instant>,
    /// Occurrences suppressed since the last notification.
    pub suppressed: u64,
}

/// The deduplicator's verdict for one occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupDecision {
    /// Notify. Carries the occurrences that were suppressed since the previous
    /// notification so the message can mention them.
    Fresh {
        /// Suppressed count accumulated before this occurrence.
        previously_suppressed: u64,
    },
    /// Drop. Carries the suppressed count including this occurrence.
    Suppressed {
        /// Occurrences suppressed since the last notification.
        count: u64,
    },
}

/// Collapses repeated occurrences of a fingerprint within a window.
#[derive(Debug)]
pub struct Deduplicator {
    window: Duration,
    entries: DashMap<Fingerprint, DedupEntry>,
}

impl Deduplicator {
    /// Creates a deduplicator with the given window.
    pub fn new(window: Duration) -> Self {
        Self { window, entries: DashMap::new() }
    }

    /// Length of the dedup window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Records an occurrence of `fingerprint` at `now` and decides its fate.
    ///
    /// The entry is updated while its shard lock is held, so concurrent
    /// occurrences of one fingerprint are strictly serialized and at most one
    /// of them holds a [`DedupDecision::Fresh`] claim at a time.
    pub fn observe(&self, fingerprint: &Fingerprint, now: Instant) -> DedupDecision {
        match self.entries.entry(fingerprint.clone()) {
            Entry::Vacant(vacant) => {
                vacant.insert(DedupEntry {
                    first_seen: now,
                    last_seen: now,
                    last_notified: Some(now),
                    suppressed: 0,
                });
                DedupDecision::Fresh { previously_suppressed: 0 }
            }
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.last_seen = now;
                let expired = match entry.last_notified {
                    Some(notified) => now.saturating_duration_since(notified) > self.window,
                    None => true,
                };
                if expired {
                    let previously_suppressed = entry.suppressed;
                    entry.last_notified = Some(now);
                    entry.suppressed = 0;
                    DedupDecision::Fresh { previously_suppressed }
                } else {
                    entry.suppressed = entry.suppressed.saturating_add(1);
                    DedupDecision::Suppressed { count: entry.suppressed }
                }
            }
        }
    }

    /// Gives back a fresh claim made at `claimed_at` whose notification never
    /// went out.
    ///
    /// The count carried by the claim is added back and the next occurrence
    /// is fresh again. Does nothing if the fingerprint has been claimed anew
    /// in the meantime.
    pub fn release(
        &self,
        fingerprint: &Fingerprint,
        claimed_at: Instant,
        previously_suppressed: u64,
    ) {
        if let Some(mut entry) = self.entries.get_mut(fingerprint) {
            if entry.last_notified == Some(claimed_at) {
                entry.last_notified = None;
                entry.suppressed = entry.suppressed.saturating_add(previously_suppressed);
            }
        }
    }

    /// Current state for `fingerprint`, if tracked.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<DedupEntry> {
        self.entries.get(fingerprint).map(|entry| *entry)
    }

    /// Drops entries that can no longer influence a decision.
    ///
    /// An expired entry with a pending suppressed count is kept for one more
    /// window so the next notification can still report the count.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| {
            let age = now.saturating_duration_since(entry.last_notified.unwrap_or(entry.last_seen));
            if entry.suppressed == 0 {
                age <= self.window
            } else {
                age <= self.window.saturating_mul(2)
            }
        });
        before.saturating_sub(self.entries.len())
    }

    /// Number of tracked fingerprints.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no fingerprint is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
