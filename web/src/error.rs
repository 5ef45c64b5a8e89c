//! Error types for web handlers.
//!
//! [`AppError`] bridges workflow and account errors to HTTP. Visitor errors
//! keep their own message; system errors carry a generic message and keep
//! the underlying error as a source that is logged but never sent.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bookings_auth::AuthError;
use bookings_core::BookingError;
use serde::Serialize;
use std::fmt;

/// Notice shown for any storage or infrastructure failure.
pub const MSG_BOOKING_FAILED: &str = "Could not complete booking, please try again";

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState>) -> Result<Json<Vec<Room>>, AppError> {
///     Ok(Json(state.flow.rooms().await?))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            message.into(),
            "BAD_REQUEST".to_string(),
        )
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            message.into(),
            "UNAUTHORIZED".to_string(),
        )
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} not found"),
            "NOT_FOUND".to_string(),
        )
    }

    /// Create a 409 Conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message.into(), "CONFLICT".to_string())
    }

    /// Create a 422 Unprocessable Entity error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            message.into(),
            "VALIDATION_ERROR".to_string(),
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            message.into(),
            "SERVICE_UNAVAILABLE".to_string(),
        )
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Message safe to show the visitor.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Log server errors with their source.
    ///
    /// Called when the error is turned into a response, and by handlers that
    /// recover from an error with a redirect instead.
    pub fn report(&self) {
        if !self.status.is_server_error() {
            return;
        }
        if let Some(source) = &self.source {
            tracing::error!(
                status = %self.status,
                code = %self.code,
                message = %self.message,
                error = %source,
                "Internal server error"
            );
        } else {
            tracing::error!(
                status = %self.status,
                code = %self.code,
                message = %self.message,
                "Internal server error"
            );
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.report();

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

impl From<BookingError> for AppError {
    fn from(error: BookingError) -> Self {
        match error {
            BookingError::ValidationFailed(_) => Self::validation(error.to_string()),
            BookingError::InvalidDates(_) => Self::bad_request(error.to_string()),
            BookingError::MissingContext(message) => Self::new(
                StatusCode::BAD_REQUEST,
                message,
                "MISSING_CONTEXT".to_string(),
            ),
            BookingError::RoomUnavailable => Self::conflict(error.to_string()),
            BookingError::NotFound(entity) => Self::not_found(entity),
            BookingError::Query(_)
            | BookingError::Persistence(_)
            | BookingError::Timeout { .. }
            | BookingError::Session(_) => {
                Self::internal(MSG_BOOKING_FAILED).with_source(anyhow::Error::new(error))
            }
        }
    }
}

impl From<AuthError> for AppError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::NotFound | AuthError::Mismatch => Self::unauthorized(error.to_string()),
            AuthError::Validation(_) | AuthError::DuplicateEmail(_) => {
                Self::validation(error.to_string())
            }
            AuthError::Hashing(_) | AuthError::Repository(_) | AuthError::Timeout { .. } => {
                Self::internal("An internal error occurred").with_source(anyhow::Error::new(error))
            }
        }
    }
}
