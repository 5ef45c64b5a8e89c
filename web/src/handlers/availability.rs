//! Availability search.
//!
//! The search page starts a new draft; the JSON endpoint answers single-room
//! checks for the date pickers and never touches the session.

use crate::error::AppError;
use crate::handlers::{SEARCH_PATH, recover};
use crate::session::Session;
use crate::state::AppState;
use crate::view::{TemplateData, templates};
use axum::{
    Form, Json,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use bookings_core::{RoomId, SessionKey, StayDates};
use serde::{Deserialize, Serialize};

/// Notice shown when a search finds no free room.
pub const MSG_NO_AVAILABILITY: &str = "No availability";
/// Message returned by the JSON endpoint when storage cannot be queried.
pub const MSG_DATABASE_ERROR: &str = "Error connecting to database";

/// Submitted search dates.
#[derive(Debug, Default, Deserialize)]
pub struct SearchForm {
    /// First night, `YYYY-MM-DD`.
    #[serde(default)]
    pub start_date: String,
    /// Departure day, `YYYY-MM-DD`.
    #[serde(default)]
    pub end_date: String,
}

/// Render the search form.
///
/// # Endpoint
///
/// ```text
/// GET /search-availability
/// ```
pub async fn search_page(State(state): State<AppState>, session: Session) -> Result<Response, AppError> {
    let mut session = session.lock().await;
    state.render(templates::SEARCH, TemplateData::new().with_defaults(&mut session))
}

/// Search for free rooms and list them.
///
/// An empty result redirects back to the search form with a notice; any
/// other failure goes through [`recover`].
///
/// # Endpoint
///
/// ```text
/// POST /search-availability
/// start_date=2050-01-01&end_date=2050-01-02
/// ```
pub async fn post_search(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SearchForm>,
) -> Result<Response, AppError> {
    let mut session = session.lock().await;

    let rooms = match state
        .flow
        .search(&mut session, &form.start_date, &form.end_date)
        .await
    {
        Ok(rooms) => rooms,
        Err(error) => return Ok(recover(&mut session, error)),
    };

    if rooms.is_empty() {
        tracing::debug!(start = %form.start_date, end = %form.end_date, "No rooms free");
        session.set_notice(SessionKey::Error, MSG_NO_AVAILABILITY);
        return Ok(Redirect::to(SEARCH_PATH).into_response());
    }

    let data = TemplateData::new()
        .with_string("start_date", form.start_date)
        .with_string("end_date", form.end_date)
        .with_data("rooms", &rooms)?
        .with_defaults(&mut session);
    state.render(templates::CHOOSE_ROOM, data)
}

/// Single-room availability query.
#[derive(Debug, Default, Deserialize)]
pub struct AvailabilityQuery {
    /// First night, `YYYY-MM-DD`. The room page's modal posts it as
    /// `start_modal`.
    #[serde(default, alias = "start_modal")]
    pub start: String,
    /// Departure day, `YYYY-MM-DD`.
    #[serde(default, alias = "end_modal")]
    pub end: String,
    /// Room to check.
    #[serde(default)]
    pub room_id: String,
}

/// Single-room availability answer.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailabilityResponse {
    /// Whether the room is free for every requested night.
    pub ok: bool,
    /// Why the check could not run, empty otherwise.
    pub message: String,
    /// Echo of the requested room.
    pub room_id: String,
    /// Echo of the requested first night.
    pub start_date: String,
    /// Echo of the requested departure day.
    pub end_date: String,
}

/// Check one room for a date range.
///
/// Always answers 200; malformed input and storage failures come back as
/// `ok: false` with a message.
///
/// # Endpoint
///
/// ```text
/// POST /search-availability-json
/// start=2050-01-01&end=2050-01-02&room_id=1
/// ```
pub async fn availability_json(
    State(state): State<AppState>,
    Form(query): Form<AvailabilityQuery>,
) -> Json<AvailabilityResponse> {
    let (ok, message) = match check(&state, &query).await {
        Ok(free) => (free, String::new()),
        Err(message) => (false, message),
    };

    Json(AvailabilityResponse {
        ok,
        message,
        room_id: query.room_id,
        start_date: query.start,
        end_date: query.end,
    })
}

async fn check(state: &AppState, query: &AvailabilityQuery) -> Result<bool, String> {
    let room_id = query
        .room_id
        .trim()
        .parse()
        .map(RoomId::new)
        .map_err(|_| "invalid room id".to_string())?;
    let stay = StayDates::parse(&query.start, &query.end).map_err(|e| e.to_string())?;

    state
        .flow
        .availability()
        .is_room_available(room_id, stay)
        .await
        .map_err(|error| {
            tracing::error!(%room_id, %stay, error = %error, "Availability check failed");
            MSG_DATABASE_ERROR.to_string()
        })
}
