//! SMTP email provider implementation using Lettre.

use crate::email::{EmailProvider, render_body};
use crate::error::{DeliveryError, Result};
use bookings_core::MailData;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// SMTP server settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmtpConfig {
    /// Server host name.
    pub host: String,
    /// Server port, usually 587.
    pub port: u16,
    /// Login, if the server requires one.
    pub username: Option<String>,
    /// Password for `username`.
    pub password: Option<String>,
}

impl SmtpConfig {
    /// Settings for an unauthenticated relay on port 587.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 587,
            username: None,
            password: None,
        }
    }

    /// Set the port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Authenticate with `username` / `password`.
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

/// Sends messages through an SMTP relay.
///
/// # Examples
///
/// ```ignore
/// use bookings_runtime::{SmtpConfig, SmtpEmailProvider};
///
/// let provider = SmtpEmailProvider::new(
///     SmtpConfig::new("smtp.example.com").with_credentials("user", "app_password"),
/// );
/// ```
#[derive(Clone, Debug)]
pub struct SmtpEmailProvider {
    config: SmtpConfig,
}

impl SmtpEmailProvider {
    /// Create a provider for the given server.
    #[must_use]
    pub const fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    /// Build a transport for one send.
    ///
    /// A fresh transport per message keeps a dropped connection from
    /// poisoning later deliveries.
    fn build_transport(&self) -> Result<SmtpTransport> {
        let mut builder = SmtpTransport::relay(&self.config.host)
            .map_err(|e| DeliveryError::Transport(format!("SMTP relay error: {e}")))?
            .port(self.config.port);
        if let (Some(username), Some(password)) = (&self.config.username, &self.config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }
        Ok(builder.build())
    }
}

fn mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse::<Mailbox>()
        .map_err(|e| DeliveryError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// Assemble the lettre message for `mail`.
///
/// # Errors
///
/// [`DeliveryError::InvalidAddress`] for an unparsable sender or recipient,
/// [`DeliveryError::Build`] if lettre rejects the message.
pub fn build_message(mail: &MailData) -> Result<Message> {
    Message::builder()
        .from(mailbox(&mail.from)?)
        .to(mailbox(&mail.to)?)
        .subject(mail.subject.clone())
        .header(ContentType::TEXT_HTML)
        .body(render_body(mail))
        .map_err(|e| DeliveryError::Build(e.to_string()))
}

impl EmailProvider for SmtpEmailProvider {
    async fn send(&self, mail: &MailData) -> Result<()> {
        let email = build_message(mail)?;
        let mailer = self.build_transport()?;

        tokio::task::spawn_blocking(move || {
            mailer
                .send(&email)
                .map_err(|e| DeliveryError::Transport(e.to_string()))
        })
        .await
        .map_err(|e| DeliveryError::Task(e.to_string()))?
        .map(|_| ())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn mail() -> MailData {
        MailData {
            to: "john@smith.com".into(),
            from: "me@here.com".into(),
            subject: "Reservation confirmation".into(),
            content: "<strong>Hi</strong>".into(),
            template: Some("basic.html".into()),
        }
    }

    #[test]
    fn message_carries_headers_and_wrapped_body() {
        let message = build_message(&mail()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("To: john@smith.com"));
        assert!(raw.contains("From: me@here.com"));
        assert!(raw.contains("Subject: Reservation confirmation"));
        assert!(raw.contains("Content-Type: text/html"));
    }

    #[test]
    fn bad_recipient_is_an_invalid_address() {
        let mut bad = mail();
        bad.to = "notanemail".into();

        let err = build_message(&bad).unwrap_err();
        assert!(matches!(err, DeliveryError::InvalidAddress { ref address, .. } if address == "notanemail"));
        assert!(!err.is_transient());
    }

    #[test]
    fn config_builder() {
        let config = SmtpConfig::new("smtp.example.com")
            .with_port(2525)
            .with_credentials("user", "secret");
        assert_eq!(config.port, 2525);
        assert_eq!(config.username.as_deref(), Some("user"));
    }
}
