use serde::Deserialize;

fn default_api_base_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_disable_web_preview() -> bool {
    true
}

/// Connection settings for the Telegram Bot API.
#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    /// Bot token issued by BotFather.
    #[serde(default)]
    pub bot_token: String,

    /// Chat (user, group or channel) that receives notifications.
    #[serde(default)]
    pub chat_id: String,

    /// Base URL of the Bot API. Overridden in tests to point at a mock server.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Whether Telegram should skip link previews in notifications.
    #[serde(default = "default_disable_web_preview")]
    pub disable_web_preview: bool,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base_url: default_api_base_url(),
            disable_web_preview: default_disable_web_preview(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telegram_config_defaults() {
        let config: TelegramConfig =
            serde_json::from_str(r#"{ "bot_token": "123:abc", "chat_id": "-100" }"#).unwrap();
        assert_eq!(config.api_base_url, "https://api.telegram.org");
        assert!(config.disable_web_preview);
        assert_eq!(config.chat_id, "-100");
    }
}
