//! A set of helpers for testing

mod clock;
mod config;
mod delivery;
mod report;

pub use clock::ManualClock;
pub use config::{TEST_BOT_TOKEN, TEST_CHAT_ID, create_test_config};
pub use delivery::{RecordingSleeper, ScriptedTransport};
pub use report::ReportBuilder;
