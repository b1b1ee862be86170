//! Data models for incoming error reports.
//!
//! An [`ErrorReport`] is what client applications post to the webhook. Once it
//! has passed [`ErrorReport::validate`] it is handed to the orchestrator and is
//! never mutated again.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Maximum length of the error message, in characters.
pub const MAX_ERROR_MESSAGE_CHARS: usize = 4000;

/// Maximum length of the stack trace, in characters.
pub const MAX_STACKTRACE_CHARS: usize = 10_000;

/// Maximum length of the short identifying fields (error type and code, file
/// and function name), in characters.
pub const MAX_FIELD_CHARS: usize = 256;

/// Maximum length of a client supplied fingerprint, in characters.
pub const MAX_FINGERPRINT_CHARS: usize = 128;

/// How severe the reported error is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The application is down or losing data.
    Critical,
    /// A failed operation.
    #[default]
    Error,
    /// Something degraded but still working.
    Warning,
    /// Informational event.
    Info,
}

impl Severity {
    /// Upper-case label shown in the notification header.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
        }
    }

    /// Colored indicator shown in front of the label.
    pub fn indicator(&self) -> &'static str {
        match self {
            Severity::Critical => "\u{1f534}",
            Severity::Error => "\u{1f7e0}",
            Severity::Warning => "\u{1f7e1}",
            Severity::Info => "\u{1f535}",
        }
    }
}

/// HTTP request context in which the error occurred.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    /// The requested URL.
    pub request_url: Option<String>,
    /// The HTTP method, e.g. `GET`.
    pub request_method: Option<String>,
    /// Request headers as sent by the client.
    pub request_headers: Option<BTreeMap<String, String>>,
    /// Raw request body.
    pub request_body: Option<String>,
    /// Status code returned to the client.
    pub response_status: Option<u16>,
    /// Raw response body.
    pub response_body: Option<String>,
    /// Parsed query string parameters.
    pub query_params: Option<BTreeMap<String, String>>,
}

/// The end user who hit the error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Application-level user id.
    pub user_id: Option<String>,
    /// Display or login name.
    pub username: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Session identifier.
    pub session_id: Option<String>,
    /// Client IP address.
    pub ip_address: Option<String>,
}

/// The host or device the error was raised on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Host name.
    pub hostname: Option<String>,
    /// Operating system name.
    pub os: Option<String>,
    /// Operating system version.
    pub os_version: Option<String>,
    /// Host IP address.
    pub ip_address: Option<String>,
    /// CPU architecture.
    pub architecture: Option<String>,
    /// CPU usage, in percent.
    pub cpu_usage: Option<f64>,
    /// Memory usage, in percent.
    pub memory_usage: Option<f64>,
    /// Disk usage, in percent.
    pub disk_usage: Option<f64>,
}

/// A structured error report as posted by a client application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Human readable error message.
    pub error_message: String,

    /// Severity of the error.
    #[serde(default)]
    pub severity: Severity,

    /// Exception class name, e.g. `ValueError`.
    pub error_type: Option<String>,
    /// Application-specific error code.
    pub error_code: Option<String>,
    /// Full stack trace text.
    pub stacktrace: Option<String>,
    /// File where the error was raised.
    pub file_name: Option<String>,
    /// Line number within `file_name`.
    pub line_number: Option<u32>,
    /// Function or method where the error was raised.
    pub function_name: Option<String>,

    /// Name of the reporting application.
    pub app_name: Option<String>,
    /// Version of the reporting application.
    pub app_version: Option<String>,
    /// Deployment environment, e.g. `production`.
    pub environment: Option<String>,
    /// Service name within a larger system.
    pub service_name: Option<String>,
    /// Component or module name.
    pub component: Option<String>,

    /// Request context.
    pub context: Option<RequestContext>,
    /// User context.
    pub user: Option<UserInfo>,
    /// Device or server context.
    pub device: Option<DeviceInfo>,

    /// Free-form key/value tags.
    pub tags: Option<BTreeMap<String, String>>,
    /// Arbitrary structured metadata.
    pub metadata: Option<Map<String, Value>>,

    /// When the error occurred. Defaults to the time the report was accepted.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// Client-supplied grouping key. Derived from the report when absent.
    pub fingerprint: Option<String>,
}

/// Reasons an incoming report is refused before it reaches the pipeline.
#[derive(Debug, Error, PartialEq)]
pub enum ReportValidationError {
    /// The error message is empty or whitespace only.
    #[error("error_message must not be empty")]
    EmptyMessage,

    /// The error message exceeds [`MAX_ERROR_MESSAGE_CHARS`].
    #[error("error_message is {0} characters long, the limit is {MAX_ERROR_MESSAGE_CHARS}")]
    MessageTooLong(usize),

    /// The stack trace exceeds [`MAX_STACKTRACE_CHARS`].
    #[error("stacktrace is {0} characters long, the limit is {MAX_STACKTRACE_CHARS}")]
    StacktraceTooLong(usize),

    /// A short identifying field exceeds its limit.
    #[error("{field} is {len} characters long, the limit is {limit}")]
    FieldTooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Its length in characters.
        len: usize,
        /// The applicable limit.
        limit: usize,
    },

    /// A device usage metric is outside `[0, 100]`.
    #[error("device.{field} must be a percentage between 0 and 100, got {value}")]
    MetricOutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
}

impl ErrorReport {
    /// Creates a report with the given message, default severity and the
    /// current time as timestamp.
    pub fn new(error_message: impl Into<String>) -> Self {
        Self { error_message: error_message.into(), timestamp: Utc::now(), ..Default::default() }
    }

    /// The built-in report sent by the test notification endpoint.
    pub fn test_notification(service: &str) -> Self {
        Self {
            severity: Severity::Info,
            error_type: Some("TestNotification".to_string()),
            app_name: Some(service.to_string()),
            environment: Some("test".to_string()),
            ..Self::new(format!("This is a test notification from {service}"))
        }
    }

    /// Checks the limits the pipeline relies on.
    pub fn validate(&self) -> Result<(), ReportValidationError> {
        if self.error_message.trim().is_empty() {
            return Err(ReportValidationError::EmptyMessage);
        }

        let message_len = self.error_message.chars().count();
        if message_len > MAX_ERROR_MESSAGE_CHARS {
            return Err(ReportValidationError::MessageTooLong(message_len));
        }

        if let Some(trace) = &self.stacktrace {
            let trace_len = trace.chars().count();
            if trace_len > MAX_STACKTRACE_CHARS {
                return Err(ReportValidationError::StacktraceTooLong(trace_len));
            }
        }

        let fields = [
            ("error_type", &self.error_type, MAX_FIELD_CHARS),
            ("error_code", &self.error_code, MAX_FIELD_CHARS),
            ("file_name", &self.file_name, MAX_FIELD_CHARS),
            ("function_name", &self.function_name, MAX_FIELD_CHARS),
            ("fingerprint", &self.fingerprint, MAX_FINGERPRINT_CHARS),
        ];
        for (field, value, limit) in fields {
            if let Some(value) = value {
                let len = value.chars().count();
                if len > limit {
                    return Err(ReportValidationError::FieldTooLong { field, len, limit });
                }
            }
        }

        if let Some(device) = &self.device {
            let metrics = [
                ("cpu_usage", device.cpu_usage),
                ("memory_usage", device.memory_usage),
                ("disk_usage", device.disk_usage),
            ];
            for (field, value) in metrics {
                if let Some(value) = value {
                    if !(0.0..=100.0).contains(&value) {
                        return Err(ReportValidationError::MetricOutOfRange { field, value });
                    }
                }
            }
        }

        Ok(())
    }
}
