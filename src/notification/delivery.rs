//! Delivery of rendered notifications with retry and backoff.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::{
    error::DeliveryError,
    telegram::{BotIdentity, MessageTransport},
};
use crate::config::HttpRetryConfig;

/// Waits between delivery attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspends the current task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How a delivery ultimately failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Every attempt failed transiently and the attempt budget ran out.
    Transient,
    /// An attempt failed in a way retrying cannot fix.
    Permanent,
    /// Shutdown interrupted the retry loop.
    Cancelled,
}

/// Terminal failure of one logical delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    /// Failure classification.
    pub kind: FailureKind,
    /// Attempts made before giving up.
    pub attempts: u32,
    /// Last error seen.
    pub reason: String,
}

impl fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            FailureKind::Transient => "retries exhausted",
            FailureKind::Permanent => "permanent failure",
            FailureKind::Cancelled => "cancelled",
        };
        write!(f, "{kind} after {} attempt(s): {}", self.attempts, self.reason)
    }
}

/// Result of one logical delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The endpoint accepted the message.
    Delivered {
        /// Attempts it took, including the successful one.
        attempts: u32,
    },
    /// The message was not delivered.
    Failed(DeliveryFailure),
}

/// Sends rendered notifications through a [`MessageTransport`], retrying
/// transient failures with exponential backoff.
#[derive(Clone)]
pub struct DeliveryClient {
    transport: Arc<dyn MessageTransport>,
    retry: HttpRetryConfig,
    sleeper: Arc<dyn Sleeper>,
    cancellation: CancellationToken,
}

impl DeliveryClient {
    /// Creates a delivery client.
    pub fn new(
        transport: Arc<dyn MessageTransport>,
        retry: HttpRetryConfig,
        sleeper: Arc<dyn Sleeper>,
        cancellation: CancellationToken,
    ) -> Self {
        Self { transport, retry, sleeper, cancellation }
    }

    /// Delivers `text`, making up to `max_attempts` attempts.
    ///
    /// Attempts for one message run one after another; a cancelled token
    /// stops the loop while it waits in backoff.
    pub async fn deliver(&self, text: &str) -> DeliveryOutcome {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.transport.send_message(text).await {
                Ok(()) => {
                    tracing::debug!(attempt, "Notification accepted by messaging endpoint.");
                    return DeliveryOutcome::Delivered { attempts: attempt };
                }
                Err(DeliveryError::Permanent(reason)) => {
                    tracing::error!(attempt, reason = %reason, "Notification rejected permanently.");
                    return DeliveryOutcome::Failed(DeliveryFailure {
                        kind: FailureKind::Permanent,
                        attempts: attempt,
                        reason,
                    });
                }
                Err(DeliveryError::Transient(reason)) => {
                    if attempt >= max_attempts {
                        tracing::error!(
                            attempt,
                            reason = %reason,
                            "Giving up on notification after exhausting retries."
                        );
                        return DeliveryOutcome::Failed(DeliveryFailure {
                            kind: FailureKind::Transient,
                            attempts: attempt,
                            reason,
                        });
                    }

                    let backoff = self.retry.backoff_for(attempt);
                    tracing::warn!(
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        reason = %reason,
                        "Transient delivery failure, retrying."
                    );

                    tokio::select! {
                        biased;
                        _ = self.cancellation.cancelled() => {
                            tracing::info!(attempt, "Delivery cancelled during backoff.");
                            return DeliveryOutcome::Failed(DeliveryFailure {
                                kind: FailureKind::Cancelled,
                                attempts: attempt,
                                reason,
                            });
                        }
                        _ = self.sleeper.sleep(backoff) => {}
                    }
                }
            }
        }
    }

    /// Checks connectivity and credentials with a single probe call.
    pub async fn ping(&self) -> Result<BotIdentity, DeliveryError> {
        self.transport.probe().await
    }
}
