//! HTTP server module

mod auth;
mod error;
mod health;
mod webhook;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;

pub use auth::{WEBHOOK_SECRET_HEADER, webhook_secret};
pub use error::{ApiError, ServerError};
pub use health::{HealthResponse, TelegramHealth};
pub use webhook::WebhookResponse;

use crate::{config::AppConfig, engine::Orchestrator};

/// Shared state of the HTTP handlers.
#[derive(Clone)]
pub struct ApiState {
    /// The report pipeline.
    pub orchestrator: Arc<Orchestrator>,
    /// Application configuration.
    pub config: Arc<AppConfig>,
}

/// Builds the router with all routes and the webhook authentication layer.
pub fn router(state: ApiState) -> Router {
    let webhook_routes = Router::new()
        .route("/webhook/error", post(webhook::receive_error))
        .route("/webhook/test", post(webhook::send_test))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::auth));

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .merge(webhook_routes)
        .with_state(state)
}

/// Runs the HTTP server until `shutdown` is cancelled.
pub async fn run_server_from_config(
    config: Arc<AppConfig>,
    orchestrator: Arc<Orchestrator>,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let address = config.server.listen_address.clone();
    let addr: SocketAddr = address
        .parse()
        .map_err(|source| ServerError::InvalidAddress { address: address.clone(), source })?;

    let app = router(ApiState { orchestrator, config });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "HTTP server listening.");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("HTTP server stopped.");
    Ok(())
}
