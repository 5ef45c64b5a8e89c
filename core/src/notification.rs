//! Outbound notifications produced by a successful booking.
//!
//! The workflow only *describes* messages ([`MailData`]) and hands them to a
//! [`Notifier`]. Delivery happens elsewhere, so a slow or broken mail server
//! never affects whether a reservation is committed.
//!
//! Bodies are HTML; guest-supplied fields are escaped before they are
//! interpolated.

use crate::types::{GuestDetails, Room, StayDates, DATE_FORMAT};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Template the guest confirmation is rendered into.
pub const GUEST_TEMPLATE: &str = "basic.html";

/// A message waiting to be delivered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailData {
    /// Recipient address.
    pub to: String,
    /// Sender address.
    pub from: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub content: String,
    /// Optional layout the body is wrapped in.
    pub template: Option<String>,
}

/// Sender and owner addresses used for booking notifications.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailConfig {
    /// `From` address of every notification.
    pub from: String,
    /// Address the owner notice goes to.
    pub owner: String,
}

impl MailConfig {
    /// Create a mail config.
    #[must_use]
    pub fn new(from: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            owner: owner.into(),
        }
    }

    /// Set the sender address.
    #[must_use]
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = from.into();
        self
    }

    /// Set the owner address.
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    /// Confirmation sent to the guest.
    #[must_use]
    pub fn guest_confirmation(&self, guest: &GuestDetails, room: &Room, stay: StayDates) -> MailData {
        let content = format!(
            "<strong>Reservation Confirmation</strong><br>\
             Dear {first_name}:<br>\
             This is to confirm your reservation of {room} from {start} to {end}.",
            first_name = escape_html(&guest.first_name),
            room = room.name,
            start = stay.start().format(DATE_FORMAT),
            end = stay.end().format(DATE_FORMAT),
        );
        MailData {
            to: guest.email.clone(),
            from: self.from.clone(),
            subject: "Reservation confirmation".to_string(),
            content,
            template: Some(GUEST_TEMPLATE.to_string()),
        }
    }

    /// Notice sent to the property owner.
    #[must_use]
    pub fn owner_notice(&self, guest: &GuestDetails, room: &Room, stay: StayDates) -> MailData {
        let content = format!(
            "<strong>Reservation Notification</strong><br>\
             A reservation has been made for {room} from {start} to {end} by {first} {last} ({email}).",
            room = room.name,
            start = stay.start().format(DATE_FORMAT),
            end = stay.end().format(DATE_FORMAT),
            first = escape_html(&guest.first_name),
            last = escape_html(&guest.last_name),
            email = escape_html(&guest.email),
        );
        MailData {
            to: self.owner.clone(),
            from: self.from.clone(),
            subject: "Room Reserved".to_string(),
            content,
            template: None,
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self::new("me@here.com", "owner@room.com")
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// What happened to a message handed to a [`Notifier`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Accepted for delivery.
    Queued,
    /// Discarded because the queue stayed full past the enqueue deadline,
    /// or no worker is running.
    Dropped,
}

/// Hands messages to an asynchronous delivery mechanism.
///
/// `enqueue` must return within a short bounded time and must never fail
/// the caller: a message that cannot be queued is dropped and reported as
/// [`EnqueueOutcome::Dropped`].
pub trait Notifier: Send + Sync {
    /// Queue a message for delivery.
    fn enqueue(&self, mail: MailData) -> Pin<Box<dyn Future<Output = EnqueueOutcome> + Send + '_>>;
}

/// Shared handle to a notifier implementation.
pub type SharedNotifier = Arc<dyn Notifier>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::RoomId;

    fn fixture() -> (GuestDetails, Room, StayDates) {
        (
            GuestDetails {
                first_name: "John".into(),
                last_name: "Smith".into(),
                email: "john@smith.com".into(),
                phone: String::new(),
            },
            Room::new(RoomId::new(1), "General's Quarters"),
            StayDates::parse("2050-01-01", "2050-01-02").unwrap(),
        )
    }

    #[test]
    fn guest_confirmation_goes_to_the_guest() {
        let (guest, room, stay) = fixture();
        let mail = MailConfig::default().guest_confirmation(&guest, &room, stay);

        assert_eq!(mail.to, "john@smith.com");
        assert_eq!(mail.from, "me@here.com");
        assert_eq!(mail.subject, "Reservation confirmation");
        assert_eq!(mail.template.as_deref(), Some(GUEST_TEMPLATE));
        assert!(mail.content.contains("General's Quarters"));
        assert!(mail.content.contains("2050-01-01"));
    }

    #[test]
    fn owner_notice_goes_to_the_owner() {
        let (guest, room, stay) = fixture();
        let mail = MailConfig::default()
            .with_owner("boss@room.com")
            .owner_notice(&guest, &room, stay);

        assert_eq!(mail.to, "boss@room.com");
        assert_eq!(mail.subject, "Room Reserved");
        assert_eq!(mail.template, None);
        assert!(mail.content.contains("2050-01-02"));
        assert!(mail.content.contains("John Smith (john@smith.com)"));
    }

    #[test]
    fn guest_fields_are_escaped_in_both_bodies() {
        let (mut guest, room, stay) = fixture();
        guest.first_name = "<a href=\"x\">Jo</a>".into();
        guest.last_name = "O'Brien & Co".into();

        let config = MailConfig::default();
        let confirmation = config.guest_confirmation(&guest, &room, stay);
        let notice = config.owner_notice(&guest, &room, stay);

        for body in [&confirmation.content, &notice.content] {
            assert!(!body.contains("<a href"));
            assert!(body.contains("&lt;a href=&quot;x&quot;&gt;Jo&lt;/a&gt;"));
        }
        assert!(notice.content.contains("O&#39;Brien &amp; Co"));
    }
}
