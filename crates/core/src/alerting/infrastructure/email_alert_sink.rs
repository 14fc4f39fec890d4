use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;

use crate::alerting::domain::alert_sink::AlertSink;

pub const ALERT_SUBJECT: &str = "Face Detection Alert";

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("invalid email address '{address}': {source}")]
    Address {
        address: String,
        source: lettre::address::AddressError,
    },
    #[error("failed to set up SMTP relay {server}: {source}")]
    Relay {
        server: String,
        source: lettre::transport::smtp::Error,
    },
    #[error("failed to build alert email: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("SMTP delivery failed: {0}")]
    Send(#[source] lettre::transport::smtp::Error),
}

/// Where and how alert emails are sent.
#[derive(Clone, Debug, PartialEq)]
pub struct EmailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub sender: String,
    pub password: String,
    pub recipient: String,
    pub timeout: Duration,
}

/// Mails each alert as a plain-text message over SMTP with STARTTLS.
///
/// The sender address doubles as the SMTP login.
pub struct EmailAlertSink {
    transport: SmtpTransport,
    from: Mailbox,
    to: Mailbox,
}

impl EmailAlertSink {
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let from = parse_mailbox(&config.sender)?;
        let to = parse_mailbox(&config.recipient)?;
        let transport = SmtpTransport::starttls_relay(&config.smtp_server)
            .map_err(|source| EmailError::Relay {
                server: config.smtp_server.clone(),
                source,
            })?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.sender.clone(),
                config.password.clone(),
            ))
            .timeout(Some(config.timeout))
            .build();
        Ok(Self {
            transport,
            from,
            to,
        })
    }

    pub fn build_message(&self, message: &str) -> Result<Message, EmailError> {
        Ok(Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(ALERT_SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(message.to_string())?)
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, EmailError> {
    address.trim().parse().map_err(|source| EmailError::Address {
        address: address.to_string(),
        source,
    })
}

impl AlertSink for EmailAlertSink {
    fn notify(&mut self, message: &str) -> Result<(), Box<dyn std::error::Error>> {
        let email = self.build_message(message)?;
        self.transport.send(&email).map_err(EmailError::Send)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmailConfig {
        EmailConfig {
            smtp_server: "smtp.example.com".into(),
            smtp_port: 587,
            sender: "camwatch@example.com".into(),
            password: "secret".into(),
            recipient: "owner@example.com".into(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_message_carries_alert_text_and_addresses() {
        let sink = EmailAlertSink::new(&config()).unwrap();
        let text = "Face Detection Alert: alice detected at door with 75.0% confidence";

        let email = sink.build_message(text).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();

        assert!(raw.contains("Subject: Face Detection Alert"));
        assert!(raw.contains("camwatch@example.com"));
        assert!(raw.contains("owner@example.com"));
        assert!(raw.contains("alice detected at door with 75.0% confidence"));
    }

    #[test]
    fn test_envelope_targets_recipient() {
        let sink = EmailAlertSink::new(&config()).unwrap();
        let email = sink.build_message("hello").unwrap();

        let to: Vec<String> = email.envelope().to().iter().map(|a| a.to_string()).collect();

        assert_eq!(to, vec!["owner@example.com"]);
    }

    #[test]
    fn test_invalid_recipient_is_rejected() {
        let bad = EmailConfig {
            recipient: "not an address".into(),
            ..config()
        };
        assert!(matches!(
            EmailAlertSink::new(&bad),
            Err(EmailError::Address { address, .. }) if address == "not an address"
        ));
    }
}
