//! Mapping from sqlx errors to repository errors.

use bookings_core::RepositoryError;

/// SQLSTATE for `exclusion_violation`.
const EXCLUSION_VIOLATION: &str = "23P01";

pub(crate) fn query(context: &str, error: &sqlx::Error) -> RepositoryError {
    tracing::error!(error = %error, "{context}");
    RepositoryError::Query(format!("{context}: {error}"))
}

pub(crate) fn not_found(entity: &'static str) -> impl FnOnce(sqlx::Error) -> RepositoryError {
    move |error| match error {
        sqlx::Error::RowNotFound => RepositoryError::not_found(entity),
        other => query(&format!("Failed to load {entity}"), &other),
    }
}

/// Map a failed write. Double-booking violations become
/// [`RepositoryError::Conflict`].
pub(crate) fn write(context: &str, error: &sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = error {
        if db.code().as_deref() == Some(EXCLUSION_VIOLATION) {
            tracing::warn!(constraint = ?db.constraint(), "{context}: room already booked");
            return RepositoryError::Conflict;
        }
    }
    tracing::error!(error = %error, "{context}");
    RepositoryError::Persistence(format!("{context}: {error}"))
}

/// Like [`write`], but a unique violation means the email is taken.
pub(crate) fn account_write(context: &str, error: &sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = error {
        if db.is_unique_violation() {
            return RepositoryError::DuplicateEmail;
        }
    }
    write(context, error)
}
