//! This module contains the data models for the relay.

pub mod outcome;
pub mod report;

pub use outcome::{Outcome, OutcomeCode};
pub use report::{
    DeviceInfo, ErrorReport, ReportValidationError, RequestContext, Severity, UserInfo,
};
