//! The `/webhook/*` endpoint handlers.

use std::time::Duration;

use axum::{
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{ApiError, ApiState, auth::webhook_secret};
use crate::models::{ErrorReport, Outcome, OutcomeCode};

/// Body returned by the webhook endpoints.
#[derive(Debug, Serialize, Clone)]
pub struct WebhookResponse {
    /// Whether the report was accepted, including when it was suppressed as
    /// a duplicate.
    pub success: bool,
    /// Stable outcome code.
    pub outcome: OutcomeCode,
    /// Human readable summary.
    pub message: String,
    /// Identifier of the sent notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_id: Option<String>,
    /// Fingerprint the report was grouped under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// Occurrences suppressed since the last notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suppressed_count: Option<u64>,
    /// Seconds until the notification budget frees up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
    /// When the response was produced.
    pub timestamp: DateTime<Utc>,
}

impl WebhookResponse {
    fn new(outcome: OutcomeCode, success: bool, message: impl Into<String>) -> Self {
        Self {
            success,
            outcome,
            message: message.into(),
            error_id: None,
            fingerprint: None,
            suppressed_count: None,
            retry_after_seconds: None,
            timestamp: Utc::now(),
        }
    }
}

/// Receives an error report and relays it to Telegram.
pub async fn receive_error(
    State(state): State<ApiState>,
    payload: Result<Json<ErrorReport>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(report) = payload.map_err(|e| ApiError::UnprocessableEntity(e.body_text()))?;
    report.validate()?;

    tracing::info!(
        severity = report.severity.label(),
        error_type = report.error_type.as_deref().unwrap_or("unknown"),
        app_name = report.app_name.as_deref().unwrap_or("unknown"),
        "Received error report."
    );

    let outcome = state.orchestrator.process(&report).await;
    outcome_response(outcome)
}

/// Sends the built-in sample notification.
pub async fn send_test(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let outcome = state.orchestrator.send_test(webhook_secret(&headers)).await;
    outcome_response(outcome)
}

/// Maps a pipeline outcome to its HTTP response.
fn outcome_response(outcome: Outcome) -> Result<Response, ApiError> {
    let code = outcome.code();
    let response = match outcome {
        Outcome::Rejected(reason) => return Err(ApiError::Unauthorized(reason)),
        Outcome::Suppressed { fingerprint, count } => {
            let mut body = WebhookResponse::new(
                code,
                true,
                "Duplicate of a recently notified error, notification suppressed",
            );
            body.fingerprint = Some(fingerprint.to_string());
            body.suppressed_count = Some(count);
            (StatusCode::OK, Json(body)).into_response()
        }
        Outcome::Throttled { fingerprint, retry_after } => {
            let seconds = retry_after_seconds(retry_after);
            let mut body = WebhookResponse::new(
                code,
                false,
                "Rate limit exceeded. Too many error reports.",
            );
            body.fingerprint = Some(fingerprint.to_string());
            body.retry_after_seconds = Some(seconds);
            let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
            response.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from(seconds));
            response
        }
        Outcome::Delivered { error_id, fingerprint, .. } => {
            let mut body =
                WebhookResponse::new(code, true, "Error notification delivered successfully");
            body.error_id = Some(error_id);
            body.fingerprint = Some(fingerprint.to_string());
            (StatusCode::OK, Json(body)).into_response()
        }
        Outcome::DeliveryFailed { error_id, fingerprint, failure } => {
            let mut body = WebhookResponse::new(
                code,
                false,
                format!("Failed to deliver notification to Telegram: {failure}"),
            );
            body.error_id = Some(error_id);
            body.fingerprint = Some(fingerprint.to_string());
            (StatusCode::BAD_GATEWAY, Json(body)).into_response()
        }
    };
    Ok(response)
}

/// Whole seconds, rounded up and never zero.
fn retry_after_seconds(retry_after: Duration) -> u64 {
    let seconds = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    seconds.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_after_rounds_up() {
        assert_eq!(retry_after_seconds(Duration::from_millis(1)), 1);
        assert_eq!(retry_after_seconds(Duration::from_millis(1500)), 2);
        assert_eq!(retry_after_seconds(Duration::from_secs(3)), 3);
        assert_eq!(retry_after_seconds(Duration::ZERO), 1);
    }
}
