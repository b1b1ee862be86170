//! The Supervisor module manages the lifecycle of the fault-relay service.
//!
//! ## Responsibilities
//!
//! - **Initialization**: The `SupervisorBuilder` constructs the orchestrator
//!   and wires it to a shared cancellation token.
//! - **Lifecycle Management**: The `Supervisor` starts the HTTP server and the
//!   dedup sweeper and manages their lifetimes.
//! - **Graceful Shutdown**: It listens for shutdown signals (Ctrl+C or
//!   SIGTERM), cancels deliveries waiting in backoff and gives the server up
//!   to `shutdown_timeout` to drain in-flight requests.
//! - **Task Supervision**: If a task fails, every other task is shut down so
//!   the process exits instead of running half-functional.

mod builder;

use std::sync::Arc;

pub use builder::SupervisorBuilder;
use thiserror::Error;
use tokio::{signal, task::JoinSet};
use tokio_util::sync::CancellationToken;

use crate::{
    config::AppConfig,
    engine::{Orchestrator, OrchestratorError},
    http_server::{self, ServerError},
};

/// Represents the set of errors that can occur during the supervisor's
/// operation.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A required configuration was not provided to the `SupervisorBuilder`.
    #[error("Missing configuration for Supervisor")]
    MissingConfig,

    /// The report pipeline could not be assembled.
    #[error("Failed to build orchestrator: {0}")]
    Orchestrator(#[from] OrchestratorError),

    /// The HTTP server failed.
    #[error("HTTP server error: {0}")]
    Server(#[from] ServerError),

    /// A supervised task panicked or was aborted.
    #[error("Supervised task failed: {0}")]
    TaskFailed(String),
}

/// The primary runtime manager for the application.
pub struct Supervisor {
    /// Shared application configuration.
    config: Arc<AppConfig>,

    /// The report pipeline shared by all request handlers.
    orchestrator: Arc<Orchestrator>,

    /// A token used to signal a graceful shutdown to all supervised tasks.
    cancellation_token: CancellationToken,

    /// A set of all spawned tasks that the supervisor is actively managing.
    join_set: JoinSet<Result<(), SupervisorError>>,
}

impl Supervisor {
    /// Creates a new Supervisor instance with all its required components.
    pub fn new(
        config: AppConfig,
        orchestrator: Arc<Orchestrator>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            config: Arc::new(config),
            orchestrator,
            cancellation_token,
            join_set: JoinSet::new(),
        }
    }

    /// Returns a new `SupervisorBuilder` instance.
    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::new()
    }

    /// Token that shuts the supervisor down when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// The shared report pipeline.
    pub fn orchestrator(&self) -> Arc<Orchestrator> {
        Arc::clone(&self.orchestrator)
    }

    /// Starts the supervisor and all its managed services, and returns once
    /// they have shut down.
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        // Spawn a task to listen for shutdown signals.
        let cancellation_token = self.cancellation_token.clone();
        self.join_set.spawn(async move {
            tokio::select! {
                _ = shutdown_signal() => cancellation_token.cancel(),
                _ = cancellation_token.cancelled() => {}
            }
            Ok(())
        });

        // Spawn the HTTP server.
        let server_config = Arc::clone(&self.config);
        let server_orchestrator = Arc::clone(&self.orchestrator);
        let server_token = self.cancellation_token.clone();
        self.join_set.spawn(async move {
            http_server::run_server_from_config(server_config, server_orchestrator, server_token)
                .await
                .map_err(SupervisorError::from)
        });

        // Spawn the dedup sweeper.
        let sweeper_orchestrator = Arc::clone(&self.orchestrator);
        let sweeper_token = self.cancellation_token.clone();
        let sweep_interval = self.config.dedup.sweep_interval_secs.max(std::time::Duration::from_secs(1));
        self.join_set.spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = sweeper_token.cancelled() => break,
                    _ = interval.tick() => {
                        let purged = sweeper_orchestrator.purge_expired();
                        if purged > 0 {
                            tracing::debug!(purged, "Purged expired dedup entries.");
                        }
                    }
                }
            }
            Ok(())
        });

        // --- Main Supervisor Loop ---
        let mut failure = None;
        loop {
            tokio::select! {
                maybe_result = self.join_set.join_next() => {
                    match maybe_result {
                        Some(Ok(Ok(()))) => {}
                        Some(Ok(Err(e))) => {
                            tracing::error!(error = %e, "A supervised task failed. Initiating shutdown.");
                            failure.get_or_insert(e);
                            self.cancellation_token.cancel();
                        }
                        Some(Err(e)) => {
                            tracing::error!("A critical task failed: {:?}. Initiating shutdown.", e);
                            failure.get_or_insert(SupervisorError::TaskFailed(e.to_string()));
                            self.cancellation_token.cancel();
                        }
                        None => break,
                    }
                }
                _ = self.cancellation_token.cancelled() => break,
            }
        }

        // --- Graceful Shutdown ---
        let shutdown_timeout = self.config.shutdown_timeout;
        tracing::info!(?shutdown_timeout, "Waiting for supervised tasks to finish...");

        let drain = async {
            while let Some(result) = self.join_set.join_next().await {
                if let Ok(Err(e)) = result {
                    tracing::error!(error = %e, "Task failed during shutdown.");
                    failure.get_or_insert(e);
                }
            }
        };
        if tokio::time::timeout(shutdown_timeout, drain).await.is_err() {
            tracing::warn!(
                "Tasks did not complete within the timeout of {:?}. Aborting them.",
                shutdown_timeout
            );
            self.join_set.shutdown().await;
        }

        tracing::info!("Supervisor shutdown complete.");
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C.");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to register SIGTERM handler.");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("SIGINT (Ctrl+C) received, initiating graceful shutdown."),
        _ = terminate => tracing::info!("SIGTERM received, initiating graceful shutdown."),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_helpers::{ScriptedTransport, create_test_config};

    fn supervisor_listening_on(address: &str) -> Supervisor {
        let mut config = create_test_config("secret");
        config.server.listen_address = address.to_string();
        config.shutdown_timeout = Duration::from_secs(2);
        Supervisor::builder()
            .config(config)
            .transport(Arc::new(ScriptedTransport::accepting()))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn run_stops_when_cancelled() {
        let supervisor = supervisor_listening_on("127.0.0.1:0");
        let token = supervisor.cancellation_token();

        let handle = tokio::spawn(supervisor.run());
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(matches!(result, Ok(Ok(Ok(())))));
    }

    #[tokio::test]
    async fn run_reports_invalid_listen_address() {
        let supervisor = supervisor_listening_on("not-an-address");

        let result = tokio::time::timeout(Duration::from_secs(5), supervisor.run()).await;
        assert!(matches!(
            result,
            Ok(Err(SupervisorError::Server(ServerError::InvalidAddress { .. })))
        ));
    }
}
