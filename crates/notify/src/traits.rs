//! Sender trait definition and shared error types.

use std::sync::Arc;

use crate::model::User;

/// Errors that can occur while resolving or delivering a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Reference object has no resolvable user")]
    UserNotFound,

    #[error("No event found for identifier {identifier}")]
    EventNotFound { identifier: String },

    #[error(
        "Sender for {label} not found: no sender is registered under slug '{slug}'"
    )]
    SenderClassNotFound { label: String, slug: String },

    #[error("Sender did not declare a slug")]
    SenderSlugMissing,

    #[error("Sender '{slug}' does not implement send")]
    SenderFunctionInvalid { slug: String },

    #[error("Recipient error: {0}")]
    Recipient(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SMTP delivery failed: {0}")]
    Smtp(String),

    #[error("Delivery rejected: {0}")]
    Delivery(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Event store error: {0}")]
    Store(String),

    #[error("Follow-up hook failed: {0}")]
    Hook(String),
}

/// Delivery capability for a single medium.
///
/// Every implementation declares the slug it is routed under. `send`
/// defaults to [`NotifyError::SenderFunctionInvalid`] so a variant that
/// never provides delivery fails loudly when selected.
#[async_trait::async_trait]
pub trait Sender: Send + Sync {
    /// Routing key matched against [`Medium::slug`](crate::model::Medium).
    fn slug(&self) -> &str;

    /// Deliver `text` to `user`.
    async fn send(&self, _user: &User, _text: &str) -> Result<(), NotifyError> {
        Err(NotifyError::SenderFunctionInvalid {
            slug: self.slug().to_string(),
        })
    }

    /// Deliver `texts[i]` to `users[i]`, pairwise.
    ///
    /// Extra entries in the longer slice are ignored. Stops at the
    /// first failed delivery.
    async fn bulk_send(&self, users: &[User], texts: &[String]) -> Result<(), NotifyError> {
        for (user, text) in users.iter().zip(texts) {
            self.send(user, text).await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl<S: Sender + ?Sized> Sender for Arc<S> {
    fn slug(&self) -> &str {
        (**self).slug()
    }

    async fn send(&self, user: &User, text: &str) -> Result<(), NotifyError> {
        (**self).send(user, text).await
    }

    async fn bulk_send(&self, users: &[User], texts: &[String]) -> Result<(), NotifyError> {
        (**self).bulk_send(users, texts).await
    }
}

/// Result of delivering a notification through a single medium.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DispatchResult {
    /// Slug of the medium the text went out through.
    pub medium: String,
    /// Display label of the medium.
    pub label: String,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait::async_trait]
    impl Sender for Recorder {
        fn slug(&self) -> &str {
            "recorder"
        }

        async fn send(&self, user: &User, text: &str) -> Result<(), NotifyError> {
            self.sent
                .lock()
                .unwrap()
                .push((user.id.clone(), text.to_string()));
            Ok(())
        }
    }

    struct Silent;

    #[async_trait::async_trait]
    impl Sender for Silent {
        fn slug(&self) -> &str {
            "silent"
        }
    }

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            ..User::default()
        }
    }

    #[tokio::test]
    async fn bulk_send_truncates_to_shorter_sequence() {
        let sender = Recorder::default();
        let users = vec![user("u1"), user("u2"), user("u3")];
        let texts = vec!["t1".to_string(), "t2".to_string()];

        sender.bulk_send(&users, &texts).await.unwrap();

        let sent = sender.sent.lock().unwrap();
        assert_eq!(
            *sent,
            vec![
                ("u1".to_string(), "t1".to_string()),
                ("u2".to_string(), "t2".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn bulk_send_with_no_users_sends_nothing() {
        let sender = Recorder::default();
        sender
            .bulk_send(&[], &["orphan".to_string()])
            .await
            .unwrap();
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn default_send_is_invalid() {
        let err = Silent.send(&user("u1"), "hello").await.unwrap_err();
        match err {
            NotifyError::SenderFunctionInvalid { slug } => assert_eq!(slug, "silent"),
            other => panic!("expected SenderFunctionInvalid, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn arc_forwards_to_inner_sender() {
        let inner = Arc::new(Recorder::default());
        let shared: Arc<dyn Sender> = inner.clone();

        assert_eq!(shared.slug(), "recorder");
        shared.send(&user("u9"), "via arc").await.unwrap();
        assert_eq!(inner.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn not_found_message_names_label_and_slug() {
        let err = NotifyError::SenderClassNotFound {
            label: "Short Message".to_string(),
            slug: "sms".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Short Message"), "got: {msg}");
        assert!(msg.contains("'sms'"), "got: {msg}");
    }
}
