//! # Notification
//!
//! Everything between a validated report and a message in the Telegram chat.
//!
//! ## Core Components
//!
//! - **`MessageFormatter`**: pure transform from an `ErrorReport` to bounded
//!   Telegram HTML.
//! - **`MessageTransport`**: one send attempt against the messaging endpoint.
//!   `TelegramTransport` is the production implementation; tests mock the
//!   trait.
//! - **`DeliveryClient`**: drives the transport with retry and backoff, and
//!   reports a `DeliveryOutcome`.

pub mod delivery;
pub mod error;
pub mod formatter;
pub mod telegram;

pub use delivery::{
    DeliveryClient, DeliveryFailure, DeliveryOutcome, FailureKind, Sleeper, TokioSleeper,
};
pub use error::{DeliveryError, NotificationError};
pub use formatter::{MessageFormatter, NotificationContext, escape_html};
pub use telegram::{BotIdentity, MessageTransport, TelegramTransport};
