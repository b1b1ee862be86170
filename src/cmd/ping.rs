//! The `ping` subcommand: checks the configured bot credentials without
//! starting the relay.

use clap::Parser;
use thiserror::Error;

use crate::{
    config::AppConfig,
    engine::{Orchestrator, OrchestratorError},
    notification::{BotIdentity, DeliveryError},
};

/// Errors that can occur while pinging the messaging endpoint.
#[derive(Error, Debug)]
pub enum PingError {
    /// The configuration could not be loaded or is incomplete.
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    /// The delivery pipeline could not be built.
    #[error("Setup error: {0}")]
    Setup(#[from] OrchestratorError),

    /// The endpoint could not be reached or rejected the credentials.
    #[error("Ping failed: {0}")]
    Delivery(#[from] DeliveryError),
}

/// Arguments for the `ping` subcommand.
#[derive(Parser, Debug)]
pub struct PingArgs {
    /// Directory holding `app.yaml`. Defaults to `configs`.
    #[arg(short, long)]
    pub config_dir: Option<String>,
}

/// Loads the configuration and probes the bot once.
pub async fn execute(args: PingArgs) -> Result<BotIdentity, PingError> {
    let config = AppConfig::new(args.config_dir.as_deref())?;
    config.validate_telegram()?;
    probe(config).await
}

/// Probes the bot described by `config`.
pub async fn probe(config: AppConfig) -> Result<BotIdentity, PingError> {
    let orchestrator = Orchestrator::builder().config(config).build()?;
    let identity = orchestrator.ping().await?;
    tracing::info!(bot_id = identity.id, username = ?identity.username, "Bot credentials verified.");
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::create_test_config;

    #[tokio::test]
    async fn probe_returns_bot_identity() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/bot123456:test-token/getMe")
            .with_status(200)
            .with_body(r#"{"ok":true,"result":{"id":42,"is_bot":true,"first_name":"Relay","username":"relay_bot"}}"#)
            .create_async()
            .await;

        let mut config = create_test_config("secret");
        config.telegram.api_base_url = server.url();

        let identity = probe(config).await.unwrap();
        assert_eq!(identity.id, 42);
        assert_eq!(identity.username.as_deref(), Some("relay_bot"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn probe_surfaces_rejected_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/bot123456:test-token/getMe")
            .with_status(401)
            .with_body(r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#)
            .create_async()
            .await;

        let mut config = create_test_config("secret");
        config.telegram.api_base_url = server.url();

        let result = probe(config).await;
        assert!(matches!(result, Err(PingError::Delivery(DeliveryError::Permanent(_)))));
    }
}
