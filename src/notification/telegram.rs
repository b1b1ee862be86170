//! Telegram Bot API transport.
//!
//! Sends rendered notifications with `sendMessage` and probes the bot with
//! `getMe`. Every HTTP outcome is classified into a [`DeliveryError`] so the
//! delivery loop can decide whether another attempt is worthwhile.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::StatusCode;
use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use reqwest_retry::Retryable;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use url::Url;

use super::error::{DeliveryError, NotificationError};
use crate::config::TelegramConfig;

/// Identity of the bot as reported by `getMe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotIdentity {
    /// Numeric bot id.
    pub id: i64,
    /// Display name.
    #[serde(default)]
    pub first_name: String,
    /// `@username` without the at sign.
    #[serde(default)]
    pub username: Option<String>,
}

/// A channel able to carry one rendered notification per call.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Performs exactly one send attempt.
    async fn send_message(&self, text: &str) -> Result<(), DeliveryError>;

    /// Checks that the endpoint is reachable and the credentials are valid.
    async fn probe(&self) -> Result<BotIdentity, DeliveryError>;
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

/// Envelope every Bot API method replies with.
#[derive(Deserialize)]
struct TelegramReply<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Sends messages to one Telegram chat.
pub struct TelegramTransport {
    client: ClientWithMiddleware,
    base_url: String,
    bot_token: String,
    chat_id: String,
    disable_web_preview: bool,
}

impl std::fmt::Debug for TelegramTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramTransport")
            .field("base_url", &self.base_url)
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

impl TelegramTransport {
    /// Creates a transport for the configured bot and chat.
    ///
    /// # Arguments
    /// * `config` - Bot token, chat id and API base URL
    /// * `client` - Shared HTTP client; its timeout bounds each attempt
    ///
    /// # Returns
    /// * `Result<Self, NotificationError>` - Transport if the config is usable
    pub fn new(
        config: &TelegramConfig,
        client: ClientWithMiddleware,
    ) -> Result<Self, NotificationError> {
        if config.bot_token.trim().is_empty() {
            return Err(NotificationError::ConfigError("Telegram bot token is empty".into()));
        }
        if config.chat_id.trim().is_empty() {
            return Err(NotificationError::ConfigError("Telegram chat id is empty".into()));
        }
        let base_url = Url::parse(&config.api_base_url).map_err(|e| {
            NotificationError::ConfigError(format!(
                "Invalid Telegram API base URL '{}': {e}",
                config.api_base_url
            ))
        })?;

        Ok(Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
            disable_web_preview: config.disable_web_preview,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.bot_token, method)
    }

    /// Sends the request once and turns the reply into a typed result or a
    /// classified error.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, DeliveryError> {
        let outcome = request.send().await;
        let retryable = Retryable::from_reqwest_response(&outcome);

        let response = match outcome {
            Ok(response) => response,
            Err(error) => {
                let reason = redact(error);
                return Err(match retryable {
                    Some(Retryable::Fatal) => DeliveryError::Permanent(reason),
                    _ => DeliveryError::Transient(reason),
                });
            }
        };

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            DeliveryError::Transient(format!("failed to read response: {}", e.without_url()))
        })?;
        let reply = serde_json::from_str::<TelegramReply<T>>(&body).ok();

        match retryable {
            Some(Retryable::Transient) => {
                return Err(DeliveryError::Transient(describe_status(status, reply.as_ref())));
            }
            Some(Retryable::Fatal) => {
                return Err(DeliveryError::Permanent(describe_status(status, reply.as_ref())));
            }
            None => {}
        }

        let reply = reply.ok_or_else(|| {
            DeliveryError::Permanent(format!("malformed response from Telegram (HTTP {status})"))
        })?;
        if !reply.ok {
            return Err(DeliveryError::Permanent(
                reply.description.unwrap_or_else(|| "Telegram replied ok=false".to_string()),
            ));
        }
        reply
            .result
            .ok_or_else(|| DeliveryError::Permanent("Telegram reply carried no result".into()))
    }
}

#[async_trait]
impl MessageTransport for TelegramTransport {
    async fn send_message(&self, text: &str) -> Result<(), DeliveryError> {
        let payload = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: self.disable_web_preview,
        };
        let request = self.client.post(self.method_url("sendMessage")).json(&payload);
        self.execute::<serde_json::Value>(request).await.map(|_| ())
    }

    async fn probe(&self) -> Result<BotIdentity, DeliveryError> {
        let request = self.client.get(self.method_url("getMe"));
        self.execute::<BotIdentity>(request).await
    }
}

/// Renders a transport error without the request URL, which embeds the bot
/// token.
fn redact(error: reqwest_middleware::Error) -> String {
    match error {
        reqwest_middleware::Error::Reqwest(e) => e.without_url().to_string(),
        reqwest_middleware::Error::Middleware(e) => e.to_string(),
    }
}

fn describe_status<T>(status: StatusCode, reply: Option<&TelegramReply<T>>) -> String {
    match reply.and_then(|r| r.description.as_deref()) {
        Some(description) => format!("HTTP {status}: {description}"),
        None => format!("HTTP {status}"),
    }
}
