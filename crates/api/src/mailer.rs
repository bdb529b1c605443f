//! Outbound email: SMTP delivery for contact-form and quote notifications.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("Invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// A message queued for delivery.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailerError>;
}

/// SMTP-backed mailer.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        from: impl Into<String>,
    ) -> Result<Self, MailerError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            .port(port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();
        Ok(Self {
            transport,
            from: from.into(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[tracing::instrument(skip(self, email), fields(to = %email.to, subject = %email.subject))]
    async fn send(&self, email: OutboundEmail) -> Result<(), MailerError> {
        let message = Message::builder()
            .from(self.from.parse()?)
            .to(email.to.parse()?)
            .subject(email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.html)?;
        self.transport.send(message).await?;
        Ok(())
    }
}

/// Records sent messages instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMailer {
    sent: Arc<RwLock<Vec<OutboundEmail>>>,
}

impl InMemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.read().expect("mailer lock").clone()
    }
}

#[async_trait]
impl Mailer for InMemoryMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailerError> {
        self.sent.write().expect("mailer lock").push(email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_mailer_records_messages() {
        let mailer = InMemoryMailer::new();
        mailer
            .send(OutboundEmail {
                to: "sales@example.com".to_string(),
                subject: "New enquiry".to_string(),
                html: "<p>Hello</p>".to_string(),
            })
            .await
            .unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "sales@example.com");
        assert_eq!(sent[0].subject, "New enquiry");
    }
}
