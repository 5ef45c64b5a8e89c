//! Error types for the booking workflow and its storage boundary.

use crate::forms::Form;
use crate::types::DateError;
use thiserror::Error;

/// Result type alias for booking operations.
pub type Result<T> = std::result::Result<T, BookingError>;

/// Failures reported by a [`ReservationRepository`](crate::repository::ReservationRepository).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// A read failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// A write failed. Nothing was persisted.
    #[error("Persistence failed: {0}")]
    Persistence(String),

    /// The requested row does not exist.
    #[error("{entity} not found")]
    NotFound {
        /// Kind of row that was looked up.
        entity: &'static str,
    },

    /// An account with this email already exists.
    #[error("Email already registered")]
    DuplicateEmail,

    /// The room was claimed by another booking between the availability
    /// check and the write.
    #[error("Room is no longer available for the requested dates")]
    Conflict,
}

impl RepositoryError {
    /// Shorthand for [`RepositoryError::NotFound`].
    #[must_use]
    pub const fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }
}

/// Comprehensive error taxonomy for the booking workflow.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BookingError {
    // ═══════════════════════════════════════════════════════════
    // Visitor Errors
    // ═══════════════════════════════════════════════════════════

    /// Submitted fields failed validation. Carries the form so it can be
    /// re-rendered with the visitor's values and messages.
    #[error("Form validation failed")]
    ValidationFailed(Box<Form>),

    /// Dates could not be parsed.
    #[error(transparent)]
    InvalidDates(#[from] DateError),

    /// The draft is missing or not in the state this step requires.
    #[error("{0}")]
    MissingContext(String),

    /// The room was taken while the visitor was filling in the form.
    #[error("Room is no longer available for the requested dates")]
    RoomUnavailable,

    /// Lookup of an entity that does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// A storage read failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// A storage write failed.
    #[error("Persistence failed: {0}")]
    Persistence(String),

    /// A storage call exceeded its deadline.
    #[error("{operation} timed out")]
    Timeout {
        /// The storage operation that timed out.
        operation: &'static str,
    },

    /// The session store failed.
    #[error("Session error: {0}")]
    Session(String),
}

impl BookingError {
    /// Shorthand for [`BookingError::MissingContext`].
    #[must_use]
    pub fn missing_context(message: impl Into<String>) -> Self {
        Self::MissingContext(message.into())
    }

    /// Returns `true` if the visitor can fix this by changing their input
    /// or restarting the flow.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::ValidationFailed(_)
                | Self::InvalidDates(_)
                | Self::MissingContext(_)
                | Self::RoomUnavailable
                | Self::NotFound(_)
        )
    }
}

impl From<RepositoryError> for BookingError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Query(message) => Self::Query(message),
            RepositoryError::Persistence(message) => Self::Persistence(message),
            RepositoryError::NotFound { entity } => Self::NotFound(entity),
            RepositoryError::DuplicateEmail => {
                Self::Persistence("Email already registered".to_string())
            }
            RepositoryError::Conflict => Self::RoomUnavailable,
        }
    }
}

/// Failures of the session store backing visitor sessions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The backing store could not be reached.
    #[error("Session store unavailable: {0}")]
    Unavailable(String),

    /// A stored session could not be decoded.
    #[error("Corrupt session data: {0}")]
    Corrupt(String),
}

impl From<SessionError> for BookingError {
    fn from(error: SessionError) -> Self {
        Self::Session(error.to_string())
    }
}
