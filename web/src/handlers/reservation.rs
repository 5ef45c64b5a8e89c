//! Room selection, guest details and the summary page.

use crate::error::AppError;
use crate::handlers::{HOME_PATH, RESERVATION_PATH, SUMMARY_PATH, recover};
use crate::session::Session;
use crate::state::AppState;
use crate::view::{TemplateData, templates};
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use bookings_core::{BookingError, DraftReservation, RoomId, SessionData, SessionKey};
use serde::Deserialize;
use std::collections::HashMap;

/// Notice for a choose-room link without a numeric id.
pub const MSG_MISSING_PARAMETER: &str = "missing url parameter";
/// Notice for a direct-book link without a numeric id.
pub const MSG_INVALID_ROOM_ID: &str = "invalid room id";

fn invalid_link(session: &mut SessionData, message: &str) -> Response {
    session.set_notice(SessionKey::Error, message);
    Redirect::to(HOME_PATH).into_response()
}

/// Pick a room from the search results.
///
/// # Endpoint
///
/// ```text
/// GET /choose-room/{id}
/// ```
pub async fn choose_room(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Response {
    let mut session = session.lock().await;

    let Ok(id) = id.parse() else {
        return invalid_link(&mut session, MSG_MISSING_PARAMETER);
    };

    match state.flow.choose_room(&mut session, RoomId::new(id)) {
        Ok(()) => Redirect::to(RESERVATION_PATH).into_response(),
        Err(error) => recover(&mut session, error),
    }
}

/// Query string of a direct-book link.
#[derive(Debug, Default, Deserialize)]
pub struct BookRoomQuery {
    /// Room id.
    #[serde(default)]
    pub id: String,
    /// First night, `YYYY-MM-DD`.
    #[serde(default)]
    pub s: String,
    /// Departure day, `YYYY-MM-DD`.
    #[serde(default)]
    pub e: String,
}

/// Start a draft directly at a room, skipping the search.
///
/// # Endpoint
///
/// ```text
/// GET /book-room?id=1&s=2050-01-01&e=2050-01-02
/// ```
pub async fn book_room(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<BookRoomQuery>,
) -> Response {
    let mut session = session.lock().await;

    let Ok(id) = query.id.trim().parse() else {
        return invalid_link(&mut session, MSG_INVALID_ROOM_ID);
    };

    match state
        .flow
        .book_room(&mut session, RoomId::new(id), &query.s, &query.e)
    {
        Ok(()) => Redirect::to(RESERVATION_PATH).into_response(),
        Err(error) => recover(&mut session, error),
    }
}

/// Render the guest details form for the chosen room.
///
/// # Endpoint
///
/// ```text
/// GET /make-reservation
/// ```
pub async fn reservation_page(
    State(state): State<AppState>,
    session: Session,
) -> Result<Response, AppError> {
    let mut session = session.lock().await;

    let draft = match state.flow.reservation_form(&mut session).await {
        Ok(draft) => draft,
        Err(error) => return Ok(recover(&mut session, error)),
    };

    let form = guest_form(&draft);
    let data = draft_view(&draft)?
        .with_form(form)
        .with_defaults(&mut session);
    state.render(templates::MAKE_RESERVATION, data)
}

/// Validate the guest details and commit the reservation.
///
/// Invalid fields re-render the form with the typed values and their
/// errors. A committed reservation redirects to the summary.
///
/// # Endpoint
///
/// ```text
/// POST /make-reservation
/// first_name=John&last_name=Smith&email=john@smith.com&phone=555-555-5555
/// ```
pub async fn post_reservation(
    State(state): State<AppState>,
    session: Session,
    Form(values): Form<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let mut session = session.lock().await;

    match state.flow.submit_details(&mut session, values).await {
        Ok(reservation_id) => {
            tracing::debug!(%reservation_id, "Redirecting to summary");
            Ok(Redirect::to(SUMMARY_PATH).into_response())
        }
        Err(BookingError::ValidationFailed(form)) => {
            let draft = match session.draft() {
                Ok(draft) => draft.clone(),
                Err(error) => return Ok(recover(&mut session, error)),
            };
            let data = draft_view(&draft)?
                .with_form(*form)
                .with_defaults(&mut session);
            state.render(templates::MAKE_RESERVATION, data)
        }
        Err(error) => Ok(recover(&mut session, error)),
    }
}

/// Show the committed reservation once.
///
/// # Endpoint
///
/// ```text
/// GET /reservation-summary
/// ```
pub async fn summary(State(state): State<AppState>, session: Session) -> Result<Response, AppError> {
    let mut session = session.lock().await;

    let draft = match state.flow.take_summary(&mut session) {
        Ok(draft) => draft,
        Err(error) => return Ok(recover(&mut session, error)),
    };

    let data = draft_view(&draft)?.with_defaults(&mut session);
    state.render(templates::SUMMARY, data)
}

fn draft_view(draft: &DraftReservation) -> Result<TemplateData, AppError> {
    let stay = draft.stay();
    TemplateData::new()
        .with_string("start_date", stay.start().to_string())
        .with_string("end_date", stay.end().to_string())
        .with_data("reservation", draft)
}

fn guest_form(draft: &DraftReservation) -> bookings_core::Form {
    let guest = draft.guest().cloned().unwrap_or_default();
    bookings_core::Form::from_pairs([
        ("first_name", guest.first_name),
        ("last_name", guest.last_name),
        ("email", guest.email),
        ("phone", guest.phone),
    ])
}
