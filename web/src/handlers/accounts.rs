//! Sign-up, sign-in, sign-out and the booked-rooms page.
//!
//! Sign-in renews the session token before checking credentials so a token
//! planted before sign-in never becomes authenticated. Unknown emails and
//! wrong passwords produce the same notice.

use crate::error::AppError;
use crate::extractors::ClientIp;
use crate::handlers::{HOME_PATH, recover};
use crate::session::Session;
use crate::state::AppState;
use crate::view::{TemplateData, templates};
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use bookings_auth::{AuthError, constants::notices};
use bookings_core::{BookingError, SessionData, SessionKey, SessionValue};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Booked-rooms notice when nobody is signed in.
pub const MSG_NO_USER: &str = "Can't get user from session";
/// Booked-rooms notice when the signed-in account no longer exists.
pub const MSG_UNKNOWN_USER: &str = "Can't find user";

/// Render the sign-up form.
///
/// # Endpoint
///
/// ```text
/// GET /user/signup
/// ```
pub async fn signup_page(State(state): State<AppState>, session: Session) -> Result<Response, AppError> {
    let mut session = session.lock().await;
    let data = TemplateData::new()
        .with_form(bookings_core::Form::default())
        .with_defaults(&mut session);
    state.render(templates::REGISTER, data)
}

/// Register an account.
///
/// Invalid fields and a taken email re-render the form, without the
/// password. Success redirects to the landing page with a notice.
///
/// # Endpoint
///
/// ```text
/// POST /user/signup
/// first_name=Jane&last_name=Doe&email=jane@doe.com&password=Secret1!
/// ```
pub async fn post_signup(
    State(state): State<AppState>,
    session: Session,
    Form(values): Form<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let mut session = session.lock().await;

    match state.accounts.register(values).await {
        Ok(_) => {
            session.set_notice(SessionKey::Flash, notices::REGISTERED);
            Ok(Redirect::to(HOME_PATH).into_response())
        }
        Err(AuthError::Validation(form) | AuthError::DuplicateEmail(form)) => {
            let mut form = *form;
            form.redact("password");
            let data = TemplateData::new()
                .with_form(form)
                .with_defaults(&mut session);
            state.render(templates::REGISTER, data)
        }
        Err(error) => Ok(account_failure(&mut session, error)),
    }
}

/// Submitted credentials.
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    /// Account email.
    #[serde(default)]
    pub email: String,
    /// Plain-text password.
    #[serde(default)]
    pub password: String,
}

/// Sign in.
///
/// # Endpoint
///
/// ```text
/// POST /user/login
/// email=jane@doe.com&password=Secret1!
/// ```
pub async fn post_login(
    State(state): State<AppState>,
    session: Session,
    ClientIp(ip): ClientIp,
    Form(form): Form<LoginForm>,
) -> Response {
    let mut session = session.lock().await;
    session.renew();

    match state.accounts.authenticate(&form.email, &form.password).await {
        Ok(user_id) => {
            session.put(SessionKey::UserId, SessionValue::User(user_id));
            session.set_notice(SessionKey::Flash, notices::LOGGED_IN);
        }
        Err(error) if error.is_credential_error() => {
            tracing::warn!(client_ip = %ip, "Rejected sign-in attempt");
            session.set_notice(SessionKey::Error, notices::INVALID_CREDENTIALS);
        }
        Err(error) => return account_failure(&mut session, error),
    }

    Redirect::to(HOME_PATH).into_response()
}

/// Sign out, discarding the whole session.
///
/// # Endpoint
///
/// ```text
/// GET /user/logout
/// ```
pub async fn logout(session: Session) -> Response {
    let mut session = session.lock().await;
    session.destroy();
    Redirect::to(HOME_PATH).into_response()
}

/// List the reservations made with the signed-in account's email.
///
/// # Endpoint
///
/// ```text
/// GET /user/booked-rooms
/// ```
pub async fn booked_rooms(State(state): State<AppState>, session: Session) -> Result<Response, AppError> {
    let mut session = session.lock().await;

    let Some(user_id) = session.user_id() else {
        return Ok(recover(&mut session, BookingError::missing_context(MSG_NO_USER)));
    };

    let reservations = match state.accounts.booked_rooms(user_id).await {
        Ok(reservations) => reservations,
        Err(AuthError::NotFound) => {
            tracing::warn!(%user_id, "Session refers to a missing account");
            return Ok(recover(&mut session, BookingError::missing_context(MSG_UNKNOWN_USER)));
        }
        Err(error) => return Ok(account_failure(&mut session, error)),
    };

    let mut data = TemplateData::new();
    data.string_map = stay_strings(&reservations);
    let data = data
        .with_data("reservations", &reservations)?
        .with_defaults(&mut session);
    state.render(templates::BOOKED_ROOMS, data)
}

/// Dates of each reservation, keyed `start_date{id}` and `end_date{id}`.
fn stay_strings(reservations: &[bookings_core::Reservation]) -> BTreeMap<String, String> {
    reservations
        .iter()
        .flat_map(|r| {
            [
                (format!("start_date{}", r.id), r.stay.start().to_string()),
                (format!("end_date{}", r.id), r.stay.end().to_string()),
            ]
        })
        .collect()
}

fn account_failure(session: &mut SessionData, error: AuthError) -> Response {
    let error = AppError::from(error);
    error.report();
    session.set_notice(SessionKey::Error, error.message());
    Redirect::to(HOME_PATH).into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bookings_core::{GuestDetails, Reservation, ReservationId, Room, RoomId, StayDates};

    #[test]
    fn stay_strings_are_keyed_by_reservation() {
        let reservation = Reservation {
            id: ReservationId::new(7),
            guest: GuestDetails::default(),
            stay: StayDates::parse("2050-01-01", "2050-01-02").unwrap(),
            room: Room::new(RoomId::new(1), "General's Quarters"),
            processed: false,
        };

        let strings = stay_strings(&[reservation]);

        assert_eq!(strings["start_date7"], "2050-01-01");
        assert_eq!(strings["end_date7"], "2050-01-02");
    }

    #[test]
    fn account_storage_failure_is_a_generic_notice() {
        let mut session = SessionData::default();
        let response = account_failure(&mut session, AuthError::Repository("gone".into()));

        assert!(response.status().is_redirection());
        let notice = session.pop_notice(SessionKey::Error).unwrap();
        assert!(!notice.contains("gone"));
    }
}
