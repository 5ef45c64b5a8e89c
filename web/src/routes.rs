//! Router configuration for the bookings site.

use crate::handlers::{accounts, availability, health, home, reservation};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// Page routes run inside the session layer; health checks do not, so
/// probes neither mint sessions nor depend on the session store for
/// liveness. Every route gets a correlation id and request tracing.
pub fn build_router(state: AppState) -> Router {
    let sessions = state.sessions.layer();

    Router::new()
        .route("/", get(home::home))
        // Availability
        .route(
            "/search-availability",
            get(availability::search_page).post(availability::post_search),
        )
        .route(
            "/search-availability-json",
            post(availability::availability_json),
        )
        // Reservation flow
        .route("/choose-room/:id", get(reservation::choose_room))
        .route("/book-room", get(reservation::book_room))
        .route(
            "/make-reservation",
            get(reservation::reservation_page).post(reservation::post_reservation),
        )
        .route("/reservation-summary", get(reservation::summary))
        // Accounts
        .route(
            "/user/signup",
            get(accounts::signup_page).post(accounts::post_signup),
        )
        .route("/user/login", post(accounts::post_login))
        .route("/user/logout", get(accounts::logout))
        .route("/user/booked-rooms", get(accounts::booked_rooms))
        .layer(sessions)
        // Health checks (no session)
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}
