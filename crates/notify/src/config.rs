//! Environment-driven configuration for the built-in senders.
//!
//! Values are read from the process environment, optionally seeded
//! from a `.env` file. A sender section is only present when its
//! enabling key is set (`SMTP_HOST`, `TELEGRAM_BOT_TOKEN`,
//! `NOTIFY_WEBHOOK_URL`).

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::traits::NotifyError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// YAML file holding the notification events.
    pub events_path: PathBuf,
    pub smtp: Option<SmtpConfig>,
    pub telegram: Option<TelegramConfig>,
    pub webhook: Option<WebhookConfig>,
}

pub const DEFAULT_EVENTS_PATH: &str = "config/events.yaml";

impl NotifyConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self::from_lookup(env_opt)
    }

    /// Build config from an arbitrary key lookup. Empty values must be
    /// reported as `None` by `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let events_path = lookup("NOTIFY_EVENTS_PATH")
            .unwrap_or_else(|| DEFAULT_EVENTS_PATH.to_string())
            .into();

        let smtp = lookup("SMTP_HOST").map(|host| SmtpConfig {
            host,
            port: lookup("SMTP_PORT").and_then(|v| v.parse().ok()),
            tls: lookup("SMTP_TLS").and_then(|v| parse_bool(&v)),
            from: lookup("SMTP_FROM").unwrap_or_else(|| "notifications@localhost".to_string()),
            subject: lookup("NOTIFY_EMAIL_SUBJECT").unwrap_or_else(|| "Notification".to_string()),
            username: lookup("SMTP_USERNAME"),
            password: lookup("SMTP_PASSWORD"),
        });

        let telegram = lookup("TELEGRAM_BOT_TOKEN").map(|bot_token| TelegramConfig {
            bot_token,
            parse_mode: lookup("TELEGRAM_PARSE_MODE"),
        });

        let webhook = lookup("NOTIFY_WEBHOOK_URL").map(|url| WebhookConfig {
            url,
            method: lookup("NOTIFY_WEBHOOK_METHOD"),
            headers: lookup("NOTIFY_WEBHOOK_HEADERS")
                .and_then(|raw| match serde_json::from_str(&raw) {
                    Ok(headers) => Some(headers),
                    Err(e) => {
                        tracing::warn!(error = %e, "NOTIFY_WEBHOOK_HEADERS is not a JSON object of strings, ignoring");
                        None
                    }
                })
                .unwrap_or_default(),
        });

        Self {
            events_path,
            smtp,
            telegram,
            webhook,
        }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Notify config loaded:");
        tracing::info!("  events:   path={}", self.events_path.display());
        match &self.smtp {
            Some(smtp) => tracing::info!(
                "  email:    host={}, port={}, from={}",
                smtp.host,
                smtp.port.map(|p| p.to_string()).unwrap_or_else(|| "(default)".to_string()),
                smtp.from
            ),
            None => tracing::info!("  email:    (disabled)"),
        }
        match &self.telegram {
            Some(tg) => tracing::info!(
                "  telegram: parse_mode={}",
                tg.parse_mode.as_deref().unwrap_or("(none)")
            ),
            None => tracing::info!("  telegram: (disabled)"),
        }
        match &self.webhook {
            Some(wh) => tracing::info!(
                "  webhook:  method={}, headers={}",
                wh.method.as_deref().unwrap_or("POST"),
                wh.headers.len()
            ),
            None => tracing::info!("  webhook:  (disabled)"),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ── Sender sections ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    /// Defaults to 587.
    pub port: Option<u16>,
    /// `None` means STARTTLS.
    pub tls: Option<bool>,
    pub from: String,
    pub subject: String,
    #[serde(skip_serializing)]
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Literal token or a `${VAR}` reference.
    #[serde(skip_serializing)]
    pub bot_token: String,
    pub parse_mode: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// May contain `${VAR}` references.
    pub url: String,
    pub method: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Resolve `${VAR_NAME}` patterns in a string using `std::env::var`.
///
/// Returns an error if a referenced variable is not set.
pub fn resolve_env_vars(input: &str) -> Result<String, NotifyError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                var_name.push(c);
            }
            if !closed {
                return Err(NotifyError::Config(format!(
                    "unclosed env var reference in: {input}"
                )));
            }
            let value = env::var(&var_name)
                .map_err(|_| NotifyError::Config(format!("env var not found: {var_name}")))?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}
