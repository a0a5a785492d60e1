//! Outbound email collaborator.
//!
//! Templates live outside this service; callers pass rendered HTML. Sends
//! are best-effort and never roll back the mutation that triggered them.

use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{GovernanceError, Result};

/// A rendered email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// Email delivery.
#[async_trait::async_trait]
pub trait EmailSender: Send + Sync {
    /// Send an email, returning the provider message id.
    async fn send(&self, email: OutgoingEmail) -> Result<String>;
}

/// Records sent emails instead of delivering them.
#[derive(Debug, Default, Clone)]
pub struct MockEmailSender {
    sent: Arc<RwLock<Vec<OutgoingEmail>>>,
    failing: bool,
}

impl MockEmailSender {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender whose every send fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.read().await.clone()
    }
}

#[async_trait::async_trait]
impl EmailSender for MockEmailSender {
    async fn send(&self, email: OutgoingEmail) -> Result<String> {
        if self.failing {
            return Err(GovernanceError::Collaborator("mail relay unavailable".to_string()));
        }
        self.sent.write().await.push(email);
        Ok(Uuid::new_v4().to_string())
    }
}

/// Logs emails at `info` and drops them. Used when no relay is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEmailSender;

#[async_trait::async_trait]
impl EmailSender for LoggingEmailSender {
    async fn send(&self, email: OutgoingEmail) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        tracing::info!(
            target: "email",
            message_id = %id,
            recipients = email.to.len(),
            subject = %email.subject,
            "Email not delivered: no relay configured"
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to: vec!["bhp@example.com".to_string()],
            subject: "Your registration was approved".to_string(),
            html: "<p>Welcome</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_mock_records() {
        let sender = MockEmailSender::new();
        sender.send(email()).await.unwrap();
        assert_eq!(sender.sent().await, vec![email()]);
    }

    #[tokio::test]
    async fn test_failing_mock() {
        assert!(MockEmailSender::failing().send(email()).await.is_err());
    }

    #[tokio::test]
    async fn test_logging_sender_succeeds() {
        assert!(!LoggingEmailSender.send(email()).await.unwrap().is_empty());
    }
}
