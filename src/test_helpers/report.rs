//! A builder for creating `ErrorReport` instances for testing.

use chrono::{DateTime, Utc};

use crate::models::{DeviceInfo, ErrorReport, RequestContext, Severity, UserInfo};

/// A builder for creating `ErrorReport` instances for testing.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    report: ErrorReport,
}

impl ReportBuilder {
    /// Creates a builder for a report with the given message.
    pub fn new(message: &str) -> Self {
        Self { report: ErrorReport::new(message) }
    }

    /// Sets the severity.
    pub fn severity(mut self, severity: Severity) -> Self {
        self.report.severity = severity;
        self
    }

    /// Sets the error type.
    pub fn error_type(mut self, error_type: &str) -> Self {
        self.report.error_type = Some(error_type.to_string());
        self
    }

    /// Sets the source location.
    pub fn location(mut self, file_name: &str, line_number: u32, function_name: &str) -> Self {
        self.report.file_name = Some(file_name.to_string());
        self.report.line_number = Some(line_number);
        self.report.function_name = Some(function_name.to_string());
        self
    }

    /// Sets the stack trace.
    pub fn stacktrace(mut self, stacktrace: &str) -> Self {
        self.report.stacktrace = Some(stacktrace.to_string());
        self
    }

    /// Sets the application name and environment.
    pub fn app(mut self, app_name: &str, environment: &str) -> Self {
        self.report.app_name = Some(app_name.to_string());
        self.report.environment = Some(environment.to_string());
        self
    }

    /// Sets the request context.
    pub fn request(mut self, context: RequestContext) -> Self {
        self.report.context = Some(context);
        self
    }

    /// Sets the user context.
    pub fn user(mut self, user: UserInfo) -> Self {
        self.report.user = Some(user);
        self
    }

    /// Sets the device context.
    pub fn device(mut self, device: DeviceInfo) -> Self {
        self.report.device = Some(device);
        self
    }

    /// Adds a tag.
    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.report.tags.get_or_insert_with(Default::default).insert(key.into(), value.into());
        self
    }

    /// Adds a metadata entry.
    pub fn metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        self.report.metadata.get_or_insert_with(Default::default).insert(key.into(), value);
        self
    }

    /// Sets a client-supplied fingerprint.
    pub fn fingerprint(mut self, fingerprint: &str) -> Self {
        self.report.fingerprint = Some(fingerprint.to_string());
        self
    }

    /// Sets the timestamp.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.report.timestamp = timestamp;
        self
    }

    /// Builds the report.
    pub fn build(self) -> ErrorReport {
        self.report
    }
}
