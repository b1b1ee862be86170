//! Defines the custom `ApiError` type for the HTTP server.

use std::net::AddrParseError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use thiserror::Error;

use crate::{
    engine::AuthRejection,
    models::{OutcomeCode, ReportValidationError},
};

/// A custom error type for the API that can be converted into an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    /// The webhook secret was missing or wrong.
    Unauthorized(AuthRejection),

    /// The request body is not a valid error report.
    UnprocessableEntity(String),
}

impl From<AuthRejection> for ApiError {
    fn from(rejection: AuthRejection) -> Self {
        ApiError::Unauthorized(rejection)
    }
}

impl From<ReportValidationError> for ApiError {
    fn from(err: ReportValidationError) -> Self {
        ApiError::UnprocessableEntity(err.to_string())
    }
}

/// Implements the conversion from `ApiError` into an `axum` response.
///
/// This is the central point for mapping internal application errors to
/// user-facing HTTP responses.
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ApiError::Unauthorized(AuthRejection::Missing) => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "success": false,
                    "outcome": OutcomeCode::RejectedUnauthorized,
                    "error": "Missing X-Webhook-Secret header",
                }),
            ),
            ApiError::Unauthorized(AuthRejection::Invalid) => (
                StatusCode::FORBIDDEN,
                json!({
                    "success": false,
                    "outcome": OutcomeCode::RejectedUnauthorized,
                    "error": "Invalid webhook secret",
                }),
            ),
            ApiError::UnprocessableEntity(message) =>
                (StatusCode::UNPROCESSABLE_ENTITY, json!({ "success": false, "error": message })),
        };

        (status, Json(body)).into_response()
    }
}

/// Errors that stop the server from starting or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    /// `server.listen_address` is not a socket address.
    #[error("Invalid server.listen_address '{address}': {source}")]
    InvalidAddress {
        /// The configured address.
        address: String,
        /// Parser error.
        source: AddrParseError,
    },

    /// Binding or serving failed.
    #[error("HTTP server I/O error: {0}")]
    Io(#[from] std::io::Error),
}
