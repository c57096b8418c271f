//! Reset mail delivery abstractions.
//!
//! The reset flow hands a rendered [`MailMessage`] to a [`Mailer`] and maps a
//! delivery error to a bad-gateway response while keeping the reset token
//! alive, reissuing supersedes it anyway. The default for local dev is
//! [`LogMailer`], which logs and returns `Ok(())`; production points
//! [`HttpMailer`] at a mailer service.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::info;
use url::Url;

use crate::APP_USER_AGENT;

/// A rendered mail ready for delivery.
#[derive(Clone, Debug, Serialize)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mail delivery abstraction used by the password-reset flow.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a message or return an error to signal the gateway failure.
    async fn send(&self, message: &MailMessage) -> Result<()>;
}

/// Local dev mailer that logs the message instead of sending real mail.
#[derive(Clone, Debug)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "mail send stub"
        );
        Ok(())
    }
}

/// Delivers mail by POSTing the message as JSON to a mailer service.
pub struct HttpMailer {
    client: Client,
    endpoint: Url,
}

impl HttpMailer {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: Url) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .context("failed to build mail client")?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        self.client
            .post(self.endpoint.clone())
            .json(message)
            .send()
            .await
            .context("mail request failed")?
            .error_for_status()
            .context("mail service rejected the message")?;

        Ok(())
    }
}

/// Renders the reset mail for an email address. `wire_token` is the
/// base64-encoded form the reset endpoints expect in their query string.
#[must_use]
pub fn reset_password_message(reset_url_base: &str, email: &str, wire_token: &str) -> MailMessage {
    let link = format!(
        "{}/reset-password?email={email}&token={wire_token}",
        reset_url_base.trim_end_matches('/')
    );

    MailMessage {
        to: email.to_string(),
        subject: "Reset your password".to_string(),
        body: format!("A password reset was requested for this address. Follow the link to choose a new password:\n\n{link}\n\nIf you did not request this, you can ignore this mail."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_message_links_the_wire_token() {
        let message =
            reset_password_message("http://localhost:3000/", "jane@example.com", "dG9rZW4=");

        assert_eq!(message.to, "jane@example.com");
        assert!(message
            .body
            .contains("http://localhost:3000/reset-password?email=jane@example.com&token=dG9rZW4="));
        // trailing slash on the base must not produce a double slash
        assert!(!message.body.contains("//reset-password"));
    }

    #[test]
    fn test_message_serializes_for_the_mailer_service() {
        let message = reset_password_message("http://localhost:3000", "jane@example.com", "t");
        let value = serde_json::to_value(&message).unwrap();

        assert!(value.get("to").is_some());
        assert!(value.get("subject").is_some());
        assert!(value.get("body").is_some());
    }
}
