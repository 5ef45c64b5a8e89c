//! View data and rendering.
//!
//! Handlers build a [`TemplateData`] bag and pass it with a template name to
//! a [`Renderer`]. The bag is completed with the session's one-shot notices
//! and sign-in status before rendering, so every page shows them exactly
//! once.

use crate::error::AppError;
use axum::Json;
use axum::response::{IntoResponse, Response};
use bookings_core::{Form, SessionData, SessionKey};
use serde::Serialize;
use std::collections::BTreeMap;

/// Template names.
pub mod templates {
    /// Landing page; the target of every "start over" redirect.
    pub const HOME: &str = "home.page.tmpl";
    /// Date search form.
    pub const SEARCH: &str = "search-availability.page.tmpl";
    /// Rooms free for the searched dates.
    pub const CHOOSE_ROOM: &str = "choose-room.page.tmpl";
    /// Guest details form.
    pub const MAKE_RESERVATION: &str = "make-reservation.page.tmpl";
    /// Committed reservation, shown once.
    pub const SUMMARY: &str = "reservation-summary.page.tmpl";
    /// Sign-up form.
    pub const REGISTER: &str = "register.page.tmpl";
    /// Reservations of the signed-in account.
    pub const BOOKED_ROOMS: &str = "booked-rooms.page.tmpl";
}

/// Everything a template can show.
#[derive(Debug, Default, Serialize)]
pub struct TemplateData {
    /// Preformatted strings, e.g. dates as `YYYY-MM-DD`.
    pub string_map: BTreeMap<String, String>,
    /// Structured page data.
    pub data: BTreeMap<String, serde_json::Value>,
    /// Submitted values and their errors, for form pages.
    pub form: Option<Form>,
    /// One-shot success notice.
    pub flash: Option<String>,
    /// One-shot warning notice.
    pub warning: Option<String>,
    /// One-shot error notice.
    pub error: Option<String>,
    /// Whether a user is signed in.
    pub is_authenticated: bool,
}

impl TemplateData {
    /// Empty view data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a preformatted string.
    #[must_use]
    pub fn with_string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.string_map.insert(key.into(), value.into());
        self
    }

    /// Add structured data.
    ///
    /// # Errors
    ///
    /// Returns an internal error if `value` cannot be serialized.
    pub fn with_data(mut self, key: impl Into<String>, value: &impl Serialize) -> Result<Self, AppError> {
        let value = serde_json::to_value(value)
            .map_err(|e| AppError::internal("Failed to prepare page").with_source(e.into()))?;
        self.data.insert(key.into(), value);
        Ok(self)
    }

    /// Attach a form.
    #[must_use]
    pub fn with_form(mut self, form: Form) -> Self {
        self.form = Some(form);
        self
    }

    /// Move the session's notices into the view and record sign-in status.
    pub fn with_defaults(mut self, session: &mut SessionData) -> Self {
        self.flash = session.pop_notice(SessionKey::Flash);
        self.warning = session.pop_notice(SessionKey::Warning);
        self.error = session.pop_notice(SessionKey::Error);
        self.is_authenticated = session.user_id().is_some();
        self
    }
}

/// Turns view data into a response.
pub trait Renderer: Send + Sync {
    /// Render `template` with `data`.
    ///
    /// # Errors
    ///
    /// Returns an internal error if rendering fails.
    fn render(&self, template: &'static str, data: TemplateData) -> Result<Response, AppError>;
}

/// Renders the view data as JSON alongside the template name.
///
/// ```json
/// { "template": "choose-room.page.tmpl", "data": { "rooms": [...] }, ... }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

#[derive(Serialize)]
struct JsonView<'a> {
    template: &'a str,
    #[serde(flatten)]
    view: TemplateData,
}

impl Renderer for JsonRenderer {
    fn render(&self, template: &'static str, data: TemplateData) -> Result<Response, AppError> {
        Ok(Json(JsonView {
            template,
            view: data,
        })
        .into_response())
    }
}
