//! Outbound email: SMTP via lettre.

use std::time::Duration;

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use crate::error::DeliveryError;

/// Sends one plain-text email. Single attempt; the caller decides what a
/// failure means.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError>;
}

/// SMTP relay configuration.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
    pub timeout: Duration,
}

/// `Notifier` that submits mail to an SMTP relay.
///
/// Port 465 uses implicit TLS; any other port upgrades with STARTTLS.
pub struct SmtpNotifier {
    config: SmtpConfig,
}

impl SmtpNotifier {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn transport(&self) -> Result<SmtpTransport, DeliveryError> {
        let creds = Credentials::new(
            self.config.username.clone(),
            self.config.password.expose_secret().to_string(),
        );

        let builder = if self.config.port == 465 {
            SmtpTransport::relay(&self.config.host)
        } else {
            SmtpTransport::starttls_relay(&self.config.host)
        }
        .map_err(|e| DeliveryError::SendFailed {
            to: self.config.host.clone(),
            reason: format!("SMTP relay error: {e}"),
        })?;

        Ok(builder
            .port(self.config.port)
            .credentials(creds)
            .timeout(Some(self.config.timeout))
            .build())
    }
}

/// Build a plain-text message.
pub fn build_message(
    from: &str,
    to: &str,
    subject: &str,
    body: &str,
) -> Result<Message, DeliveryError> {
    Message::builder()
        .from(from.parse().map_err(|e| DeliveryError::InvalidAddress {
            address: from.to_string(),
            reason: format!("{e}"),
        })?)
        .to(to.parse().map_err(|e| DeliveryError::InvalidAddress {
            address: to.to_string(),
            reason: format!("{e}"),
        })?)
        .subject(subject)
        .body(body.to_string())
        .map_err(|e| DeliveryError::SendFailed {
            to: to.to_string(),
            reason: format!("Failed to build email: {e}"),
        })
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        let email = build_message(&self.config.from_address, to, subject, body)?;
        let transport = self.transport()?;
        let recipient = to.to_string();

        // lettre's SmtpTransport is blocking
        tokio::task::spawn_blocking(move || transport.send(&email))
            .await
            .map_err(|e| DeliveryError::SendFailed {
                to: recipient.clone(),
                reason: format!("SMTP task failed: {e}"),
            })?
            .map_err(|e| DeliveryError::SendFailed {
                to: recipient.clone(),
                reason: format!("SMTP send failed: {e}"),
            })?;

        info!(to = %recipient, subject, "Email sent");
        Ok(())
    }
}
