//! The fault-relay engine: authentication, deduplication, rate limiting and
//! the orchestrator that ties them to delivery.

pub mod auth;
pub mod clock;
pub mod deduplicator;
pub mod orchestrator;
pub mod rate_limiter;

pub use auth::{AuthDecision, AuthGate, AuthRejection, generate_error_id, generate_secret};
pub use clock::{Clock, SystemClock};
pub use deduplicator::{DedupDecision, DedupEntry, Deduplicator, Fingerprint};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, OrchestratorError, SERVICE_NAME};
pub use rate_limiter::{Admission, RateLimiter};
