//! Authentication middleware for the HTTP server.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use super::{ApiState, error::ApiError};
use crate::engine::AuthDecision;

/// Header carrying the shared webhook secret.
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// Reads the webhook secret from the request headers.
pub fn webhook_secret(headers: &HeaderMap) -> Option<&str> {
    headers.get(WEBHOOK_SECRET_HEADER).and_then(|value| value.to_str().ok())
}

/// Middleware that checks the webhook secret before the body is read, so
/// unauthenticated callers learn nothing about the payload schema.
pub async fn auth(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let decision = state.orchestrator.authorize(webhook_secret(request.headers()));
    match decision {
        AuthDecision::Authorized => Ok(next.run(request).await),
        AuthDecision::Rejected(reason) => {
            tracing::warn!(?reason, path = %request.uri().path(), "Rejected webhook call.");
            Err(ApiError::Unauthorized(reason))
        }
    }
}
