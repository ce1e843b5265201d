//! SMTP email sender via `lettre` with TLS support.
//!
//! Delivers rendered text as a plain-text email to the user's address.
//! Supports STARTTLS and implicit TLS connections.

use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};

use crate::config::SmtpConfig;
use crate::model::User;
use crate::traits::{NotifyError, Sender};

/// Sends notifications as emails via SMTP.
#[derive(Debug)]
pub struct EmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    subject: String,
}

impl EmailSender {
    pub const SLUG: &'static str = "email";

    /// Build an `EmailSender` from SMTP configuration.
    ///
    /// Port 465 uses implicit TLS; any other port uses STARTTLS unless
    /// `tls` is `Some(false)`, in which case the connection is plain.
    /// Credentials are attached only when both username and password
    /// are configured.
    pub fn from_config(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))?;

        let port = config.port.unwrap_or(587);
        let use_tls = config.tls.unwrap_or(true);

        let mut builder = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| NotifyError::Config(e.to_string()))?
                .port(port)
        } else if use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| NotifyError::Config(e.to_string()))?
                .port(port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host).port(port)
        };

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            subject: config.subject.clone(),
        })
    }

    fn recipient(user: &User) -> Result<Mailbox, NotifyError> {
        let address = user.email.as_deref().ok_or_else(|| {
            NotifyError::Recipient(format!("user '{}' has no email address", user.id))
        })?;
        address.parse().map_err(|e: lettre::address::AddressError| {
            NotifyError::Recipient(format!("invalid email address '{address}': {e}"))
        })
    }
}

#[async_trait::async_trait]
impl Sender for EmailSender {
    fn slug(&self) -> &str {
        Self::SLUG
    }

    async fn send(&self, user: &User, text: &str) -> Result<(), NotifyError> {
        let to = Self::recipient(user)?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&self.subject)
            .body(text.to_string())
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        tracing::info!(
            channel = Self::SLUG,
            user = %user.id,
            subject = %self.subject,
            "notification delivered"
        );

        Ok(())
    }
}
