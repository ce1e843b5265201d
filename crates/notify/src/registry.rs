//! Slug → sender lookup table.
//!
//! Senders are registered once at startup, keyed by slug, and the
//! registry is shared read-only afterwards. Each lookup instantiates
//! a sender through its factory; a sender without a slug is only
//! rejected at that point, never at registration.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::NotifyConfig;
use crate::email::EmailSender;
use crate::log::LogSender;
use crate::model::Medium;
use crate::telegram::TelegramSender;
use crate::traits::{NotifyError, Sender};
use crate::webhook::WebhookSender;

/// Builds a sender instance on demand.
pub type SenderFactory = Arc<dyn Fn() -> Result<Box<dyn Sender>, NotifyError> + Send + Sync>;

/// Registered sender factories, keyed by slug.
#[derive(Clone, Default)]
pub struct SenderRegistry {
    factories: HashMap<String, SenderFactory>,
}

impl SenderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry with the built-in senders whose configuration
    /// is present. The `log` sender is always registered.
    pub fn from_config(config: &NotifyConfig) -> Result<Self, NotifyError> {
        let mut registry = Self::new();

        registry.register_sender(LogSender);

        if let Some(smtp) = &config.smtp {
            registry.register_sender(EmailSender::from_config(smtp)?);
        }
        if let Some(telegram) = &config.telegram {
            registry.register_sender(TelegramSender::from_config(telegram)?);
        }
        if let Some(webhook) = &config.webhook {
            registry.register_sender(WebhookSender::from_config(webhook)?);
        }

        tracing::debug!(slugs = ?registry.slugs(), "sender registry built");
        Ok(registry)
    }

    /// Register a factory under `slug`. A later registration for the
    /// same slug replaces the earlier one.
    pub fn register<F>(&mut self, slug: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Box<dyn Sender>, NotifyError> + Send + Sync + 'static,
    {
        let slug = slug.into();
        if self.factories.contains_key(&slug) {
            tracing::warn!(slug = %slug, "sender slug registered twice, replacing");
        }
        self.factories.insert(slug, Arc::new(factory));
    }

    /// Register a prebuilt sender under its declared slug. Every lookup
    /// hands out a handle to the same shared instance.
    pub fn register_sender<S>(&mut self, sender: S)
    where
        S: Sender + 'static,
    {
        let shared = Arc::new(sender);
        let slug = shared.slug().to_string();
        self.register(slug, move || Ok(Box::new(Arc::clone(&shared)) as Box<dyn Sender>));
    }

    /// Snapshot of the registrations present right now.
    pub fn all_senders(&self) -> HashMap<String, SenderFactory> {
        self.factories.clone()
    }

    /// Registered slugs, sorted.
    pub fn slugs(&self) -> Vec<&str> {
        let mut slugs: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        slugs.sort_unstable();
        slugs
    }

    /// Instantiate the sender registered for `medium.slug`.
    ///
    /// # Errors
    ///
    /// - [`NotifyError::SenderClassNotFound`] if nothing is registered
    ///   under the slug.
    /// - [`NotifyError::SenderSlugMissing`] if the registration or the
    ///   built sender has an empty slug.
    /// - Any error returned by the factory itself.
    pub fn get_sender(&self, medium: &Medium) -> Result<Box<dyn Sender>, NotifyError> {
        let factory = self
            .factories
            .get(&medium.slug)
            .ok_or_else(|| NotifyError::SenderClassNotFound {
                label: medium.label.clone(),
                slug: medium.slug.clone(),
            })?;

        if medium.slug.is_empty() {
            return Err(NotifyError::SenderSlugMissing);
        }

        let sender = factory()?;
        if sender.slug().is_empty() {
            return Err(NotifyError::SenderSlugMissing);
        }

        Ok(sender)
    }
}

impl fmt::Debug for SenderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderRegistry")
            .field("slugs", &self.slugs())
            .finish()
    }
}
