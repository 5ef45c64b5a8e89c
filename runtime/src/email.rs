//! Email provider abstraction.
//!
//! Providers are used through generics by the dispatcher, so the trait uses
//! `impl Future` returns rather than boxed futures.

use crate::error::Result;
use bookings_core::MailData;
use std::future::Future;

/// Placeholder a layout uses to mark where the message body goes.
pub const BODY_PLACEHOLDER: &str = "[%body%]";

/// Layout used for messages carrying `template = "basic.html"`.
const BASIC_LAYOUT: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        [%body%]
    </div>
</body>
</html>
"#;

/// Sends one message.
pub trait EmailProvider: Send + Sync + 'static {
    /// Deliver `mail`.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`](crate::DeliveryError) if the message is
    /// malformed or the transport fails.
    fn send(&self, mail: &MailData) -> impl Future<Output = Result<()>> + Send;
}

/// The HTML body to send for `mail`.
///
/// A message naming a known layout is wrapped in it. Unknown layout names
/// fall back to the bare content with a warning.
#[must_use]
pub fn render_body(mail: &MailData) -> String {
    match mail.template.as_deref() {
        None => mail.content.clone(),
        Some(bookings_core::notification::GUEST_TEMPLATE) => {
            BASIC_LAYOUT.replace(BODY_PLACEHOLDER, &mail.content)
        }
        Some(other) => {
            tracing::warn!(template = other, "Unknown email layout, sending bare body");
            mail.content.clone()
        }
    }
}
