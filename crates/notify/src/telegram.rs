//! Telegram Bot API sender.
//!
//! Delivers rendered text through the `sendMessage` endpoint to the
//! user's Telegram chat.

use crate::config::{resolve_env_vars, TelegramConfig};
use crate::model::User;
use crate::traits::{NotifyError, Sender};

/// Escapes special characters for Telegram MarkdownV2 parse mode.
///
/// Telegram requires these characters to be escaped with a preceding backslash
/// when using MarkdownV2: `_`, `*`, `[`, `]`, `(`, `)`, `~`, `` ` ``, `>`,
/// `#`, `+`, `-`, `=`, `|`, `{`, `}`, `.`, `!`
pub fn escape_markdown_v2(text: &str) -> String {
    let special = ['_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!'];
    let mut result = String::with_capacity(text.len() * 2);
    for ch in text.chars() {
        if special.contains(&ch) {
            result.push('\\');
        }
        result.push(ch);
    }
    result
}

/// Sends notifications via the Telegram Bot API.
#[derive(Debug)]
pub struct TelegramSender {
    bot_token: String,
    parse_mode: Option<String>,
    client: reqwest::Client,
}

impl TelegramSender {
    pub const SLUG: &'static str = "telegram";

    /// Creates a new `TelegramSender` from configuration values.
    ///
    /// `${VAR_NAME}` references in the token are resolved from the
    /// environment. Returns [`NotifyError::Config`] if the token is empty
    /// or a referenced env var is missing.
    pub fn from_config(config: &TelegramConfig) -> Result<Self, NotifyError> {
        let resolved_token = resolve_env_vars(&config.bot_token)?;

        if resolved_token.is_empty() {
            return Err(NotifyError::Config(
                "Telegram bot token must not be empty".to_string(),
            ));
        }

        Ok(Self {
            bot_token: resolved_token,
            parse_mode: config.parse_mode.clone(),
            client: reqwest::Client::new(),
        })
    }

    fn message_body(&self, chat_id: &str, text: &str) -> serde_json::Value {
        let text = match self.parse_mode.as_deref() {
            Some("MarkdownV2") => escape_markdown_v2(text),
            _ => text.to_string(),
        };

        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });

        if let Some(ref mode) = self.parse_mode {
            body["parse_mode"] = serde_json::Value::String(mode.clone());
        }

        body
    }
}

#[async_trait::async_trait]
impl Sender for TelegramSender {
    fn slug(&self) -> &str {
        Self::SLUG
    }

    async fn send(&self, user: &User, text: &str) -> Result<(), NotifyError> {
        let chat_id = user.telegram_chat_id.as_deref().ok_or_else(|| {
            NotifyError::Recipient(format!("user '{}' has no telegram chat id", user.id))
        })?;

        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let body = self.message_body(chat_id, text);

        tracing::debug!(
            chat_id,
            parse_mode = ?self.parse_mode,
            "Sending Telegram notification"
        );

        let response = self.client.post(&url).json(&body).send().await?;
        let resp_body: serde_json::Value = response.json().await?;

        if resp_body.get("ok") == Some(&serde_json::Value::Bool(true)) {
            tracing::info!(channel = Self::SLUG, user = %user.id, chat_id, "notification delivered");
            return Ok(());
        }

        let description = resp_body
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown Telegram API error");

        Err(NotifyError::Delivery(format!(
            "Telegram API error: {description}"
        )))
    }
}
