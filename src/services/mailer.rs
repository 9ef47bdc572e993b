//! Outbound email delivery.
//!
//! Confirmation mail is dispatched through the `Mailer` trait. The
//! default implementation logs the message; wire an SMTP-backed
//! implementation here when real delivery is needed.

use async_trait::async_trait;

use crate::errors::AppResult;

/// An email ready for delivery
#[derive(Debug, Clone)]
pub struct EmailMessage {
    /// Recipient email address
    pub to: String,
    /// Email subject line
    pub subject: String,
    /// Email body content (plain text)
    pub body: String,
}

impl EmailMessage {
    /// Create a new message
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Email delivery trait for dependency injection.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a message
    async fn send(&self, message: EmailMessage) -> AppResult<()>;
}

/// Development mailer: logs messages instead of sending them.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> AppResult<()> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "=== EMAIL (not sent) ===\n{}\n========================",
            message.body
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_accepts_messages() {
        let mailer = LogMailer;
        let message = EmailMessage::new("a@example.com", "Confirm your email", "code");
        assert!(mailer.send(message).await.is_ok());
    }
}
