//! Terminal outcomes of the report pipeline.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    engine::{AuthRejection, Fingerprint},
    notification::DeliveryFailure,
};

/// Stable, documented code for each terminal outcome.
///
/// The routing layer maps these to protocol responses; integrators rely on the
/// string form to tell "throttled" apart from "never received".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeCode {
    /// The credential was missing or wrong.
    RejectedUnauthorized,
    /// The report repeated a recently notified fingerprint.
    SuppressedDuplicate,
    /// The outbound notification budget was exhausted.
    Throttled,
    /// The notification reached the messaging endpoint.
    Delivered,
    /// The messaging endpoint could not be reached or refused the message.
    DeliveryFailed,
}

impl OutcomeCode {
    /// The wire representation of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeCode::RejectedUnauthorized => "rejected-unauthorized",
            OutcomeCode::SuppressedDuplicate => "suppressed-duplicate",
            OutcomeCode::Throttled => "throttled",
            OutcomeCode::Delivered => "delivered",
            OutcomeCode::DeliveryFailed => "delivery-failed",
        }
    }
}

impl fmt::Display for OutcomeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of pushing one report through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The caller failed authentication.
    Rejected(AuthRejection),

    /// Same fingerprint was already notified within the dedup window.
    Suppressed {
        /// Fingerprint of the suppressed report.
        fingerprint: Fingerprint,
        /// Number of occurrences suppressed since the last notification.
        count: u64,
    },

    /// The rate limiter refused the notification.
    Throttled {
        /// Fingerprint of the throttled report.
        fingerprint: Fingerprint,
        /// Time until budget frees up.
        retry_after: Duration,
    },

    /// The notification was delivered.
    Delivered {
        /// Identifier shown in the notification footer.
        error_id: String,
        /// Fingerprint of the delivered report.
        fingerprint: Fingerprint,
        /// Number of attempts it took.
        attempts: u32,
    },

    /// Delivery failed after the retry policy ran its course.
    DeliveryFailed {
        /// Identifier of the lost notification.
        error_id: String,
        /// Fingerprint of the report.
        fingerprint: Fingerprint,
        /// Why delivery failed.
        failure: DeliveryFailure,
    },
}

impl Outcome {
    /// The stable code for this outcome.
    pub fn code(&self) -> OutcomeCode {
        match self {
            Outcome::Rejected(_) => OutcomeCode::RejectedUnauthorized,
            Outcome::Suppressed { .. } => OutcomeCode::SuppressedDuplicate,
            Outcome::Throttled { .. } => OutcomeCode::Throttled,
            Outcome::Delivered { .. } => OutcomeCode::Delivered,
            Outcome::DeliveryFailed { .. } => OutcomeCode::DeliveryFailed,
        }
    }

    /// The fingerprint the outcome refers to, if the report got that far.
    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        match self {
            Outcome::Rejected(_) => None,
            Outcome::Suppressed { fingerprint, .. }
            | Outcome::Throttled { fingerprint, .. }
            | Outcome::Delivered { fingerprint, .. }
            | Outcome::DeliveryFailed { fingerprint, .. } => Some(fingerprint),
        }
    }
}
