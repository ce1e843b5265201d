//! Sender that only writes the notification to the tracing log.
//!
//! Always registered; useful for dry runs and local development.

use crate::model::User;
use crate::traits::{NotifyError, Sender};

#[derive(Debug, Default, Clone, Copy)]
pub struct LogSender;

impl LogSender {
    pub const SLUG: &'static str = "log";
}

#[async_trait::async_trait]
impl Sender for LogSender {
    fn slug(&self) -> &str {
        Self::SLUG
    }

    async fn send(&self, user: &User, text: &str) -> Result<(), NotifyError> {
        tracing::info!(channel = Self::SLUG, user = %user.id, text, "notification");
        Ok(())
    }
}
