//! HTTP request handlers.
//!
//! Page handlers never answer a workflow error with an error page: they
//! record a notice in the session and redirect, so the next rendered view
//! shows it. See [`recover`].

pub mod accounts;
pub mod availability;
pub mod health;
pub mod home;
pub mod reservation;

use crate::error::AppError;
use axum::response::{IntoResponse, Redirect, Response};
use bookings_core::{BookingError, SessionData, SessionKey};

/// Landing page, the target of every "start over" redirect.
pub const HOME_PATH: &str = "/";
/// Date search page.
pub const SEARCH_PATH: &str = "/search-availability";
/// Guest details page.
pub const RESERVATION_PATH: &str = "/make-reservation";
/// Committed reservation page.
pub const SUMMARY_PATH: &str = "/reservation-summary";

/// Turn a workflow error into an error notice plus a redirect.
///
/// A room lost to a concurrent booking sends the visitor back to the search
/// page; everything else starts over from the landing page. Storage
/// failures are logged here and shown with a generic message.
pub fn recover(session: &mut SessionData, error: BookingError) -> Response {
    let target = match error {
        BookingError::RoomUnavailable => SEARCH_PATH,
        _ => HOME_PATH,
    };

    let error = AppError::from(error);
    error.report();
    session.set_notice(SessionKey::Error, error.message());

    Redirect::to(target).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{StatusCode, header};
    use bookings_core::session::MSG_NO_DRAFT;

    #[test]
    fn missing_context_starts_over() {
        let mut session = SessionData::default();
        let response = recover(&mut session, BookingError::missing_context(MSG_NO_DRAFT));

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], HOME_PATH);
        assert_eq!(session.pop_notice(SessionKey::Error).as_deref(), Some(MSG_NO_DRAFT));
    }

    #[test]
    fn lost_room_goes_back_to_search() {
        let mut session = SessionData::default();
        let response = recover(&mut session, BookingError::RoomUnavailable);

        assert_eq!(response.headers()[header::LOCATION], SEARCH_PATH);
        assert!(session.exists(SessionKey::Error));
    }

    #[test]
    fn storage_failures_show_a_generic_notice() {
        let mut session = SessionData::default();
        recover(&mut session, BookingError::Persistence("disk full".into()));

        assert_eq!(
            session.pop_notice(SessionKey::Error).as_deref(),
            Some(crate::error::MSG_BOOKING_FAILED)
        );
    }
}
