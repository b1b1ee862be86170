//! This module provides the `SupervisorBuilder` for constructing a `Supervisor`.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{Supervisor, SupervisorError};
use crate::{config::AppConfig, engine::Orchestrator, notification::MessageTransport};

/// A builder for creating a `Supervisor` instance.
#[derive(Default)]
pub struct SupervisorBuilder {
    config: Option<AppConfig>,
    transport: Option<Arc<dyn MessageTransport>>,
}

impl SupervisorBuilder {
    /// Creates a new, empty `SupervisorBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the application configuration for the `Supervisor`.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides the transport the orchestrator delivers through.
    pub fn transport(mut self, transport: Arc<dyn MessageTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Assembles the orchestrator and wires it to the supervisor's
    /// cancellation token.
    pub fn build(self) -> Result<Supervisor, SupervisorError> {
        let config = self.config.ok_or(SupervisorError::MissingConfig)?;
        let cancellation_token = CancellationToken::new();

        let mut orchestrator =
            Orchestrator::builder().config(config.clone()).cancellation_token(cancellation_token.clone());
        if let Some(transport) = self.transport {
            orchestrator = orchestrator.transport(transport);
        }
        let orchestrator = orchestrator.build()?;

        tracing::debug!(
            max_notifications = config.rate_limit.max_notifications,
            rate_window_secs = config.rate_limit.window_secs.as_secs(),
            dedup_window_secs = config.dedup.window_secs.as_secs(),
            "Report pipeline assembled."
        );

        Ok(Supervisor::new(config, Arc::new(orchestrator), cancellation_token))
    }
}
