//! Error types for account operations.

use bookings_core::{Form, RepositoryError};
use thiserror::Error;

/// Result type alias for account operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Error taxonomy for registration and sign-in.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Authentication Errors
    // ═══════════════════════════════════════════════════════════

    /// No account uses the given email.
    ///
    /// Rendered to visitors exactly like [`AuthError::Mismatch`].
    #[error("Invalid credentials")]
    NotFound,

    /// The password does not match the stored hash.
    #[error("Invalid credentials")]
    Mismatch,

    // ═══════════════════════════════════════════════════════════
    // Registration Errors
    // ═══════════════════════════════════════════════════════════

    /// Submitted fields failed validation.
    #[error("Form validation failed")]
    Validation(Box<Form>),

    /// The email is taken. The form carries a field error on `email`.
    #[error("Email already registered")]
    DuplicateEmail(Box<Form>),

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Hashing or parsing a password hash failed.
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    /// The repository failed.
    #[error("Repository error: {0}")]
    Repository(String),

    /// A repository call exceeded its deadline.
    #[error("{operation} timed out")]
    Timeout {
        /// The repository operation that timed out.
        operation: &'static str,
    },
}

impl AuthError {
    /// Returns `true` for wrong email or password.
    ///
    /// # Examples
    ///
    /// ```
    /// use bookings_auth::AuthError;
    ///
    /// assert!(AuthError::NotFound.is_credential_error());
    /// assert!(AuthError::Mismatch.is_credential_error());
    /// assert!(!AuthError::Hashing("bad salt".into()).is_credential_error());
    /// ```
    #[must_use]
    pub const fn is_credential_error(&self) -> bool {
        matches!(self, Self::NotFound | Self::Mismatch)
    }

    /// Returns `true` if this error is due to invalid user input.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound | Self::Mismatch | Self::Validation(_) | Self::DuplicateEmail(_)
        )
    }
}

impl From<RepositoryError> for AuthError {
    fn from(error: RepositoryError) -> Self {
        Self::Repository(error.to_string())
    }
}
