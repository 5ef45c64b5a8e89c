//! Application state for Axum handlers.

use crate::session::Sessions;
use crate::view::{Renderer, TemplateData};
use crate::error::AppError;
use axum::response::Response;
use bookings_auth::AccountService;
use bookings_core::BookingFlow;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply, via `Arc`) for each request.
#[derive(Clone)]
pub struct AppState {
    /// The booking workflow
    pub flow: Arc<BookingFlow>,

    /// Registration and sign-in
    pub accounts: Arc<AccountService>,

    /// Visitor session machinery
    pub sessions: Sessions,

    /// Page renderer
    pub renderer: Arc<dyn Renderer>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        flow: BookingFlow,
        accounts: AccountService,
        sessions: Sessions,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            flow: Arc::new(flow),
            accounts: Arc::new(accounts),
            sessions,
            renderer,
        }
    }

    /// Render `template` through the configured renderer.
    ///
    /// # Errors
    ///
    /// Returns an internal error if rendering fails.
    pub fn render(&self, template: &'static str, data: TemplateData) -> Result<Response, AppError> {
        self.renderer.render(template, data)
    }
}
