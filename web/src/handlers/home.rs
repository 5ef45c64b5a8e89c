//! Landing page.

use crate::error::AppError;
use crate::session::Session;
use crate::state::AppState;
use crate::view::{TemplateData, templates};
use axum::{extract::State, response::Response};

/// Render the landing page with any pending notices.
///
/// # Endpoint
///
/// ```text
/// GET /
/// ```
pub async fn home(State(state): State<AppState>, session: Session) -> Result<Response, AppError> {
    let mut session = session.lock().await;
    state.render(templates::HOME, TemplateData::new().with_defaults(&mut session))
}
