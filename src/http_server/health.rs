//! The `/health` and `/` endpoint handlers.

use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use serde::Serialize;

use super::ApiState;
use crate::engine::SERVICE_NAME;

/// Telegram connectivity as seen by the probe.
#[derive(Debug, Serialize, Clone)]
pub struct TelegramHealth {
    /// Whether `getMe` succeeded.
    pub connected: bool,
    /// The bot's username, when connected.
    pub bot_username: Option<String>,
}

/// Represents the response from the `/health` endpoint.
#[derive(Debug, Serialize, Clone)]
pub struct HealthResponse {
    /// `healthy` when Telegram is reachable, `degraded` otherwise.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// The version of the application.
    pub version: &'static str,
    /// Downstream connectivity.
    pub telegram: TelegramHealth,
}

/// Reports service health, including Telegram connectivity.
pub async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let telegram = match state.orchestrator.ping().await {
        Ok(identity) => TelegramHealth { connected: true, bot_username: identity.username },
        Err(e) => {
            tracing::warn!(error = %e, "Telegram probe failed.");
            TelegramHealth { connected: false, bot_username: None }
        }
    };

    Json(HealthResponse {
        status: if telegram.connected { "healthy" } else { "degraded" },
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        telegram,
    })
}

/// Service information.
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ["/webhook/error", "/webhook/test", "/health"],
    }))
}
