//! Generic HTTP webhook sender.
//!
//! Delivers `{ "user": ..., "text": ... }` as JSON to a configured
//! endpoint with optional custom headers.

use std::collections::HashMap;

use crate::config::{resolve_env_vars, WebhookConfig};
use crate::model::User;
use crate::traits::{NotifyError, Sender};

/// Delivers notifications as JSON over HTTP to a configured endpoint.
///
/// Environment variable references (`${VAR_NAME}`) in the URL and
/// header values are resolved at construction time.
#[derive(Debug)]
pub struct WebhookSender {
    url: String,
    /// Host of `url`, the only part of it that is logged.
    host: String,
    method: reqwest::Method,
    headers: HashMap<String, String>,
    client: reqwest::Client,
}

#[derive(serde::Serialize)]
struct WebhookPayload<'a> {
    user: &'a User,
    text: &'a str,
}

impl WebhookSender {
    pub const SLUG: &'static str = "webhook";

    /// Construct a [`WebhookSender`] from its config section.
    ///
    /// `method` defaults to `POST` and is parsed case-insensitively.
    /// Missing env vars and invalid methods produce [`NotifyError::Config`].
    pub fn from_config(config: &WebhookConfig) -> Result<Self, NotifyError> {
        let method = match &config.method {
            Some(m) => m
                .to_uppercase()
                .parse::<reqwest::Method>()
                .map_err(|_| NotifyError::Config(format!("invalid HTTP method: {m}")))?,
            None => reqwest::Method::POST,
        };

        let url = resolve_env_vars(&config.url)?;
        let host = reqwest::Url::parse(&url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "<invalid url>".to_string());

        let mut headers = HashMap::with_capacity(config.headers.len());
        for (key, value) in &config.headers {
            headers.insert(key.clone(), resolve_env_vars(value)?);
        }

        Ok(Self {
            url,
            host,
            method,
            headers,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait::async_trait]
impl Sender for WebhookSender {
    fn slug(&self) -> &str {
        Self::SLUG
    }

    async fn send(&self, user: &User, text: &str) -> Result<(), NotifyError> {
        let mut request = self
            .client
            .request(self.method.clone(), &self.url)
            .json(&WebhookPayload { user, text });

        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(
                host = %self.host,
                %status,
                body = %body_text,
                "webhook returned non-2xx status"
            );
            return Err(NotifyError::Delivery(format!(
                "webhook returned {status}: {body_text}"
            )));
        }

        tracing::debug!(
            host = %self.host,
            method = %self.method,
            status = %status,
            user = %user.id,
            "webhook notification delivered"
        );

        Ok(())
    }
}
