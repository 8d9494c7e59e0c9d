//! Outbound mail.
//!
//! Handlers depend on the [`Mailer`] trait; production wires in
//! [`HttpMailer`], which talks to a transactional mail HTTP API.

pub mod http;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use self::http::HttpMailer;

/// A single plain-text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    /// The fixed message used to verify mail configuration.
    pub fn test_message(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: "Test Email".to_string(),
            body: "This is a test email to verify the email configuration.".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("mail API rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid mail configuration: {0}")]
    Config(String),
}

/// Something that can deliver an [`EmailMessage`].
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}
