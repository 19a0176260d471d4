use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::UserResult;

pub const RESET_PASSWORD_SUBJECT: &str = "Password reset link";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl MailMessage {
    pub fn password_reset(from: &str, to: &str, reset_token: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            subject: RESET_PASSWORD_SUBJECT.to_string(),
            body: format!(
                "A password reset was requested for {to}.\n\n\
                 Reset token: {reset_token}\n\n\
                 Submit it together with your email and a new password to /api/reset-password.\n\
                 If you did not request a reset, ignore this message."
            ),
        }
    }
}

/// Outgoing mail transport.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: MailMessage) -> UserResult<()>;
}

/// Logs messages instead of delivering them.
#[derive(Debug, Default, Clone)]
pub struct LoggingMailer;

#[async_trait]
impl Mailer for LoggingMailer {
    async fn send(&self, message: MailMessage) -> UserResult<()> {
        info!(to = %message.to, subject = %message.subject, "Mail sent");
        Ok(())
    }
}

/// Keeps sent messages in memory.
#[derive(Debug, Default)]
pub struct InMemoryMailer {
    sent: RwLock<Vec<MailMessage>>,
}

impl InMemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<MailMessage> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl Mailer for InMemoryMailer {
    async fn send(&self, message: MailMessage) -> UserResult<()> {
        self.sent.write().await.push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_message_contains_token_and_email() {
        let message = MailMessage::password_reset("no-reply@example.com", "jane@example.com", "abc123");
        assert_eq!(message.subject, "Password reset link");
        assert_eq!(message.from, "no-reply@example.com");
        assert!(message.body.contains("abc123"));
        assert!(message.body.contains("jane@example.com"));
    }

    #[tokio::test]
    async fn test_in_memory_mailer_records() {
        let mailer = InMemoryMailer::new();
        mailer
            .send(MailMessage::password_reset("a@x.com", "b@x.com", "t"))
            .await
            .unwrap();
        assert_eq!(mailer.sent().await.len(), 1);
    }
}
