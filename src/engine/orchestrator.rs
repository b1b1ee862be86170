//! The report pipeline.
//!
//! For one incoming report the orchestrator authenticates the caller,
//! deduplicates by fingerprint, charges the rate limiter, renders the message
//! and hands it to the delivery client. Every decision that touches shared
//! state is taken before the network call, so no lock is ever held across an
//! `.await`.

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::{
    Admission, AuthDecision, AuthGate, Clock, DedupDecision, Deduplicator, Fingerprint,
    RateLimiter, SystemClock, generate_error_id,
};
use crate::{
    config::AppConfig,
    http_client::create_http_client,
    models::{ErrorReport, Outcome},
    notification::{
        BotIdentity, DeliveryClient, DeliveryError, DeliveryOutcome, MessageFormatter,
        MessageTransport, NotificationContext, NotificationError, Sleeper, TelegramTransport,
        TokioSleeper,
    },
};

/// Name the relay reports itself under.
pub const SERVICE_NAME: &str = "fault-relay";

/// Errors raised while assembling an [`Orchestrator`].
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// No configuration was supplied to the builder.
    #[error("Missing configuration")]
    MissingConfig,

    /// The transport could not be created from the configuration.
    #[error("Notification setup error: {0}")]
    Notification(#[from] NotificationError),
}

/// Composes authentication, deduplication, rate limiting, formatting and
/// delivery into one decision per report.
pub struct Orchestrator {
    auth: AuthGate,
    deduplicator: Deduplicator,
    rate_limiter: RateLimiter,
    formatter: MessageFormatter,
    delivery: DeliveryClient,
    clock: Arc<dyn Clock>,
}

impl Orchestrator {
    /// Creates a new, empty `OrchestratorBuilder`.
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Checks the caller's credential.
    pub fn authorize(&self, credential: Option<&str>) -> AuthDecision {
        self.auth.check(credential)
    }

    /// Runs one report through the whole pipeline.
    pub async fn handle(&self, report: &ErrorReport, credential: Option<&str>) -> Outcome {
        if let AuthDecision::Rejected(reason) = self.authorize(credential) {
            tracing::warn!(?reason, "Rejected report from unauthenticated caller.");
            return Outcome::Rejected(reason);
        }
        self.process(report).await
    }

    /// Runs an already authenticated report through deduplication, rate
    /// limiting and delivery.
    pub async fn process(&self, report: &ErrorReport) -> Outcome {
        let fingerprint = Fingerprint::for_report(report);
        let now = self.clock.now();

        let previously_suppressed = match self.deduplicator.observe(&fingerprint, now) {
            DedupDecision::Suppressed { count } => {
                tracing::debug!(fingerprint = %fingerprint, count, "Suppressed duplicate report.");
                return Outcome::Suppressed { fingerprint, count };
            }
            DedupDecision::Fresh { previously_suppressed } => previously_suppressed,
        };

        if let Admission::Throttled { retry_after } = self.rate_limiter.admit(now) {
            tracing::warn!(
                fingerprint = %fingerprint,
                retry_after_ms = retry_after.as_millis() as u64,
                "Notification budget exhausted, report throttled."
            );
            self.deduplicator.release(&fingerprint, now, previously_suppressed);
            return Outcome::Throttled { fingerprint, retry_after };
        }

        let outcome = self.notify(report, fingerprint.clone(), previously_suppressed).await;
        if let Outcome::DeliveryFailed { .. } = outcome {
            self.deduplicator.release(&fingerprint, now, previously_suppressed);
        }
        outcome
    }

    /// Sends the built-in sample report. It skips deduplication but still
    /// counts against the notification budget.
    pub async fn send_test(&self, credential: Option<&str>) -> Outcome {
        if let AuthDecision::Rejected(reason) = self.authorize(credential) {
            tracing::warn!(?reason, "Rejected test notification from unauthenticated caller.");
            return Outcome::Rejected(reason);
        }

        let report = ErrorReport::test_notification(SERVICE_NAME);
        let fingerprint = Fingerprint::for_report(&report);

        if let Admission::Throttled { retry_after } = self.rate_limiter.admit(self.clock.now()) {
            tracing::warn!(fingerprint = %fingerprint, "Test notification throttled.");
            return Outcome::Throttled { fingerprint, retry_after };
        }

        self.notify(&report, fingerprint, 0).await
    }

    async fn notify(
        &self,
        report: &ErrorReport,
        fingerprint: Fingerprint,
        suppressed_since_last: u64,
    ) -> Outcome {
        let error_id = generate_error_id();
        let context = NotificationContext {
            error_id: &error_id,
            fingerprint: &fingerprint,
            suppressed_since_last,
        };
        let text = self.formatter.render(report, &context);

        match self.delivery.deliver(&text).await {
            DeliveryOutcome::Delivered { attempts } => {
                tracing::info!(
                    error_id = %error_id,
                    fingerprint = %fingerprint,
                    severity = report.severity.label(),
                    attempts,
                    "Notification delivered."
                );
                Outcome::Delivered { error_id, fingerprint, attempts }
            }
            DeliveryOutcome::Failed(failure) => {
                tracing::error!(
                    error_id = %error_id,
                    fingerprint = %fingerprint,
                    kind = ?failure.kind,
                    attempts = failure.attempts,
                    reason = %failure.reason,
                    "Notification could not be delivered."
                );
                Outcome::DeliveryFailed { error_id, fingerprint, failure }
            }
        }
    }

    /// Probes the messaging endpoint.
    pub async fn ping(&self) -> Result<BotIdentity, DeliveryError> {
        self.delivery.ping().await
    }

    /// Evicts dedup entries that can no longer suppress anything. Returns how
    /// many were removed.
    pub fn purge_expired(&self) -> usize {
        self.deduplicator.purge_expired(self.clock.now())
    }

    /// The shared rate limiter.
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// The shared deduplicator.
    pub fn deduplicator(&self) -> &Deduplicator {
        &self.deduplicator
    }
}

/// A builder for creating an `Orchestrator` instance.
#[derive(Default)]
pub struct OrchestratorBuilder {
    config: Option<AppConfig>,
    transport: Option<Arc<dyn MessageTransport>>,
    clock: Option<Arc<dyn Clock>>,
    sleeper: Option<Arc<dyn Sleeper>>,
    cancellation: Option<CancellationToken>,
}

impl OrchestratorBuilder {
    /// Sets the application configuration.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides the transport. Defaults to Telegram built from the config.
    pub fn transport(mut self, transport: Arc<dyn MessageTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Overrides the clock. Defaults to the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Overrides the backoff sleeper. Defaults to the tokio timer.
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    /// Token whose cancellation aborts deliveries waiting in backoff.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Assembles the pipeline.
    pub fn build(self) -> Result<Orchestrator, OrchestratorError> {
        let config = self.config.ok_or(OrchestratorError::MissingConfig)?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let client = create_http_client(&config.http_base_config)
                    .map_err(NotificationError::from)?;
                Arc::new(TelegramTransport::new(&config.telegram, client)?)
            }
        };

        let delivery = DeliveryClient::new(
            transport,
            config.http_retry_config.clone(),
            self.sleeper.unwrap_or_else(|| Arc::new(TokioSleeper)),
            self.cancellation.unwrap_or_default(),
        );

        Ok(Orchestrator {
            auth: AuthGate::new(config.server.webhook_secret.as_deref().unwrap_or_default()),
            deduplicator: Deduplicator::new(config.dedup.window_secs),
            rate_limiter: RateLimiter::new(
                config.rate_limit.max_notifications,
                config.rate_limit.window_secs,
            ),
            formatter: MessageFormatter::new(config.formatting.clone()),
            delivery,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        engine::AuthRejection,
        models::OutcomeCode,
        notification::{FailureKind, telegram::MockMessageTransport},
        test_helpers::{ManualClock, RecordingSleeper, create_test_config},
    };

    const SECRET: &str = "test-secret";

    fn build(transport: MockMessageTransport, clock: Arc<ManualClock>) -> Orchestrator {
        Orchestrator::builder()
            .config(create_test_config(SECRET))
            .transport(Arc::new(transport))
            .clock(clock)
            .sleeper(Arc::new(RecordingSleeper::default()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_fails_without_config() {
        let result = Orchestrator::builder().build();
        assert!(matches!(result, Err(OrchestratorError::MissingConfig)));
    }

    #[test]
    fn test_build_creates_telegram_transport_from_config() {
        let result = Orchestrator::builder().config(create_test_config(SECRET)).build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_build_fails_with_invalid_telegram_config() {
        let mut config = create_test_config(SECRET);
        config.telegram.bot_token = String::new();
        let result = Orchestrator::builder().config(config).build();
        assert!(matches!(result, Err(OrchestratorError::Notification(_))));
    }

    #[tokio::test]
    async fn test_rejected_caller_never_reaches_transport() {
        let mut transport = MockMessageTransport::new();
        transport.expect_send_message().never();
        let orchestrator = build(transport, Arc::new(ManualClock::new()));

        let report = ErrorReport::new("boom");
        assert_eq!(
            orchestrator.handle(&report, None).await,
            Outcome::Rejected(AuthRejection::Missing)
        );
        assert_eq!(
            orchestrator.handle(&report, Some("wrong")).await,
            Outcome::Rejected(AuthRejection::Invalid)
        );
        assert!(orchestrator.deduplicator().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_is_suppressed_without_network_call() {
        let mut transport = MockMessageTransport::new();
        transport.expect_send_message().times(1).returning(|_| Ok(()));
        let clock = Arc::new(ManualClock::new());
        let orchestrator = build(transport, clock.clone());

        let report = ErrorReport::new("boom");
        let first = orchestrator.handle(&report, Some(SECRET)).await;
        assert!(matches!(first, Outcome::Delivered { attempts: 1, .. }));

        clock.advance(Duration::from_secs(1));
        let second = orchestrator.handle(&report, Some(SECRET)).await;
        assert!(matches!(second, Outcome::Suppressed { count: 1, .. }));
        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[tokio::test]
    async fn test_notification_after_window_mentions_suppressed_count() {
        let mut transport = MockMessageTransport::new();
        transport.expect_send_message().times(1).returning(|_| Ok(()));
        transport
            .expect_send_message()
            .withf(|text| text.contains("Occurred 2 more times"))
            .times(1)
            .returning(|_| Ok(()));
        let clock = Arc::new(ManualClock::new());
        let orchestrator = build(transport, clock.clone());

        let report = ErrorReport::new("boom");
        orchestrator.handle(&report, Some(SECRET)).await;
        orchestrator.handle(&report, Some(SECRET)).await;
        orchestrator.handle(&report, Some(SECRET)).await;

        clock.advance(Duration::from_secs(301));
        let outcome = orchestrator.handle(&report, Some(SECRET)).await;
        assert!(matches!(outcome, Outcome::Delivered { .. }));
    }

    #[tokio::test]
    async fn test_delivery_failure_is_reported() {
        let mut transport = MockMessageTransport::new();
        transport
            .expect_send_message()
            .times(1)
            .returning(|_| Err(DeliveryError::Permanent("chat not found".into())));
        let orchestrator = build(transport, Arc::new(ManualClock::new()));

        let outcome = orchestrator.handle(&ErrorReport::new("boom"), Some(SECRET)).await;
        match outcome {
            Outcome::DeliveryFailed { failure, error_id, .. } => {
                assert_eq!(failure.kind, FailureKind::Permanent);
                assert_eq!(error_id.len(), 24);
            }
            other => panic!("expected delivery failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_delivery_leaves_next_occurrence_fresh() {
        let mut transport = MockMessageTransport::new();
        let mut seq = mockall::Sequence::new();
        transport
            .expect_send_message()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(DeliveryError::Permanent("chat not found".into())));
        transport.expect_send_message().times(1).in_sequence(&mut seq).returning(|_| Ok(()));
        let clock = Arc::new(ManualClock::new());
        let orchestrator = build(transport, clock.clone());
        let report = ErrorReport::new("boom");

        let first = orchestrator.handle(&report, Some(SECRET)).await;
        clock.advance(Duration::from_secs(1));
        let second = orchestrator.handle(&report, Some(SECRET)).await;

        assert_eq!(first.code(), OutcomeCode::DeliveryFailed);
        assert_eq!(second.code(), OutcomeCode::Delivered);
    }

    #[tokio::test]
    async fn test_send_test_bypasses_dedup_but_uses_budget() {
        let mut transport = MockMessageTransport::new();
        transport
            .expect_send_message()
            .withf(|text| text.contains("TestNotification"))
            .times(2)
            .returning(|_| Ok(()));
        let orchestrator = build(transport, Arc::new(ManualClock::new()));

        let before = orchestrator.rate_limiter().remaining(orchestrator.clock.now());
        assert!(matches!(orchestrator.send_test(Some(SECRET)).await, Outcome::Delivered { .. }));
        assert!(matches!(orchestrator.send_test(Some(SECRET)).await, Outcome::Delivered { .. }));
        let after = orchestrator.rate_limiter().remaining(orchestrator.clock.now());

        assert_eq!(before - after, 2);
        assert!(orchestrator.deduplicator().is_empty());
    }

    #[tokio::test]
    async fn test_purge_expired_uses_injected_clock() {
        let mut transport = MockMessageTransport::new();
        transport.expect_send_message().returning(|_| Ok(()));
        let clock = Arc::new(ManualClock::new());
        let orchestrator = build(transport, clock.clone());

        orchestrator.handle(&ErrorReport::new("a"), Some(SECRET)).await;
        orchestrator.handle(&ErrorReport::new("b"), Some(SECRET)).await;
        assert_eq!(orchestrator.purge_expired(), 0);

        clock.advance(Duration::from_secs(301));
        assert_eq!(orchestrator.purge_expired(), 2);
        assert!(orchestrator.deduplicator().is_empty());
    }
}
