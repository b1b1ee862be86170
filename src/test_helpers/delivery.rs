//! Test doubles for the delivery path.

use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;

use crate::notification::{BotIdentity, DeliveryError, MessageTransport, Sleeper};

/// A sleeper that records the requested delays and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Delays requested so far, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap_or_else(PoisonError::into_inner).push(duration);
    }
}

/// A transport that replays scripted results and records what it was asked
/// to send. Once the script runs out every send succeeds.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<(), DeliveryError>>>,
    sent: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    /// A transport that accepts every message.
    pub fn accepting() -> Self {
        Self::default()
    }

    /// A transport that answers the first sends with `results`.
    pub fn with_script(results: impl IntoIterator<Item = Result<(), DeliveryError>>) -> Self {
        Self { script: Mutex::new(results.into_iter().collect()), sent: Mutex::default() }
    }

    /// Number of send attempts so far.
    pub fn calls(&self) -> usize {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Texts of all send attempts so far.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl MessageTransport for ScriptedTransport {
    async fn send_message(&self, text: &str) -> Result<(), DeliveryError> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).push(text.to_string());
        self.script.lock().unwrap_or_else(PoisonError::into_inner).pop_front().unwrap_or(Ok(()))
    }

    async fn probe(&self) -> Result<BotIdentity, DeliveryError> {
        Ok(BotIdentity {
            id: 1,
            first_name: "Test Relay".to_string(),
            username: Some("test_relay_bot".to_string()),
        })
    }
}
