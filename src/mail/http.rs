//! Mail delivery over a JSON HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::config::MailConfig;
use crate::mail::{EmailMessage, MailError, Mailer};

/// Posts messages to a transactional mail API with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: Client,
    endpoint: Url,
    token: String,
    sender: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl HttpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let endpoint =
            Url::parse(&config.api_url).map_err(|e| MailError::Config(e.to_string()))?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            token: config.api_token.clone(),
            sender: config.sender.clone(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let request = SendRequest {
            from: &self.sender,
            to: &message.to,
            subject: &message.subject,
            text: &message.body,
        };

        let mut builder = self.client.post(self.endpoint.clone()).json(&request);
        if !self.token.is_empty() {
            builder = builder.bearer_auth(&self.token);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(to = %message.to, subject = %message.subject, "Email sent");
        Ok(())
    }
}
