//! Console email provider for development.

use crate::email::{EmailProvider, render_body};
use crate::error::Result;
use bookings_core::MailData;
use tracing::info;

/// Logs messages instead of sending them.
///
/// Used when no SMTP host is configured, so the booking flow can be run
/// locally without a mail server.
#[derive(Clone, Debug, Default)]
pub struct ConsoleEmailProvider;

impl ConsoleEmailProvider {
    /// Create a new console email provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl EmailProvider for ConsoleEmailProvider {
    async fn send(&self, mail: &MailData) -> Result<()> {
        info!(
            to = %mail.to,
            from = %mail.from,
            subject = %mail.subject,
            template = ?mail.template,
            body = %render_body(mail),
            "Email (development mode)"
        );
        Ok(())
    }
}
