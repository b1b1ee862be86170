use serde::Deserialize;

/// Configuration for the webhook HTTP server.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address and port for the HTTP server to listen on.
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Shared secret callers must send in the `X-Webhook-Secret` header.
    /// If not set in config, falls back to `FAULT_RELAY_WEBHOOK_SECRET` env var.
    #[serde(default = "default_webhook_secret_from_env")]
    pub webhook_secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            webhook_secret: default_webhook_secret_from_env(),
        }
    }
}

/// Provides the default value for listen_address.
fn default_listen_address() -> String {
    "0.0.0.0:8000".to_string()
}

/// Loads the webhook secret from the `FAULT_RELAY_WEBHOOK_SECRET` environment
/// variable.
fn default_webhook_secret_from_env() -> Option<String> {
    std::env::var("FAULT_RELAY_WEBHOOK_SECRET").ok()
}
