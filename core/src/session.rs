//! Visitor session state.
//!
//! A session is a small map from [`SessionKey`] to [`SessionValue`] that is
//! loaded once per request, mutated by the handler, and written back by the
//! web layer. Keys and values are closed enums, so reading a draft either
//! yields a [`DraftReservation`] or fails through one checked path
//! ([`SessionData::draft`]) regardless of whether the entry was absent or
//! held something else.

use crate::draft::DraftReservation;
use crate::error::{BookingError, SessionError};
use crate::types::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use uuid::Uuid;

/// Notice shown when a step needs a draft the session does not hold.
pub const MSG_NO_DRAFT: &str = "Can't get reservation from session";

/// Opaque identifier carried in the session cookie.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate a fresh random token.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wrap a token read from a cookie.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token as sent in the cookie.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Well-known session entries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SessionKey {
    /// The in-progress or just-committed reservation draft.
    Reservation,
    /// Id of the signed-in account.
    UserId,
    /// One-shot success notice.
    Flash,
    /// One-shot warning notice.
    Warning,
    /// One-shot error notice.
    Error,
}

/// Values that may be stored in a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionValue {
    /// A reservation draft.
    Draft(DraftReservation),
    /// A signed-in account.
    User(UserId),
    /// A notice string.
    Notice(String),
}

/// Everything stored for one visitor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    values: BTreeMap<SessionKey, SessionValue>,
}

impl SessionData {
    /// Read an entry.
    #[must_use]
    pub fn get(&self, key: SessionKey) -> Option<&SessionValue> {
        self.values.get(&key)
    }

    /// Store an entry, replacing any previous value.
    pub fn put(&mut self, key: SessionKey, value: SessionValue) {
        self.values.insert(key, value);
    }

    /// Remove and return an entry.
    pub fn remove(&mut self, key: SessionKey) -> Option<SessionValue> {
        self.values.remove(&key)
    }

    /// Whether an entry is present.
    #[must_use]
    pub fn exists(&self, key: SessionKey) -> bool {
        self.values.contains_key(&key)
    }

    /// `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The current reservation draft.
    ///
    /// # Errors
    ///
    /// [`BookingError::MissingContext`] when no draft is stored.
    pub fn draft(&self) -> Result<&DraftReservation, BookingError> {
        match self.values.get(&SessionKey::Reservation) {
            Some(SessionValue::Draft(draft)) => Ok(draft),
            _ => Err(BookingError::missing_context(MSG_NO_DRAFT)),
        }
    }

    /// Store the reservation draft.
    pub fn set_draft(&mut self, draft: DraftReservation) {
        self.put(SessionKey::Reservation, SessionValue::Draft(draft));
    }

    /// Remove and return the reservation draft.
    ///
    /// # Errors
    ///
    /// [`BookingError::MissingContext`] when no draft is stored. An entry of
    /// the wrong type is left untouched.
    pub fn take_draft(&mut self) -> Result<DraftReservation, BookingError> {
        match self.values.remove(&SessionKey::Reservation) {
            Some(SessionValue::Draft(draft)) => Ok(draft),
            Some(other) => {
                self.values.insert(SessionKey::Reservation, other);
                Err(BookingError::missing_context(MSG_NO_DRAFT))
            }
            None => Err(BookingError::missing_context(MSG_NO_DRAFT)),
        }
    }

    /// The signed-in account, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        match self.values.get(&SessionKey::UserId) {
            Some(SessionValue::User(id)) => Some(*id),
            _ => None,
        }
    }

    /// Record a one-shot notice under `key`.
    pub fn set_notice(&mut self, key: SessionKey, message: impl Into<String>) {
        self.put(key, SessionValue::Notice(message.into()));
    }

    /// Remove and return the notice under `key`.
    pub fn pop_notice(&mut self, key: SessionKey) -> Option<String> {
        match self.values.remove(&key) {
            Some(SessionValue::Notice(message)) => Some(message),
            Some(other) => {
                self.values.insert(key, other);
                None
            }
            None => None,
        }
    }
}

/// Boxed future returned by session store methods.
pub type SessionFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SessionError>> + Send + 'a>>;

/// Backing store for [`SessionData`].
///
/// Each `save` restarts the expiry clock, so sessions expire after `ttl`
/// of inactivity.
pub trait SessionStore: Send + Sync {
    /// Load a session. `None` if it never existed or has expired.
    ///
    /// # Errors
    ///
    /// [`SessionError`] if the store is unreachable or the data is corrupt.
    fn load<'a>(&'a self, token: &'a SessionToken) -> SessionFuture<'a, Option<SessionData>>;

    /// Write a session and refresh its expiry.
    ///
    /// # Errors
    ///
    /// [`SessionError::Unavailable`] if the store is unreachable.
    fn save<'a>(
        &'a self,
        token: &'a SessionToken,
        data: &'a SessionData,
        ttl: Duration,
    ) -> SessionFuture<'a, ()>;

    /// Delete a session.
    ///
    /// # Errors
    ///
    /// [`SessionError::Unavailable`] if the store is unreachable.
    fn destroy<'a>(&'a self, token: &'a SessionToken) -> SessionFuture<'a, ()>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::StayDates;

    fn draft() -> DraftReservation {
        DraftReservation::dates_selected(StayDates::parse("2050-01-01", "2050-01-02").unwrap(), vec![])
    }

    #[test]
    fn draft_is_missing_context_when_absent() {
        let session = SessionData::default();
        assert_eq!(
            session.draft(),
            Err(BookingError::missing_context(MSG_NO_DRAFT))
        );
    }

    #[test]
    fn draft_of_wrong_type_is_missing_context() {
        let mut session = SessionData::default();
        session.set_notice(SessionKey::Reservation, "not a draft");

        assert!(session.draft().is_err());
        assert!(session.take_draft().is_err());
        assert!(session.exists(SessionKey::Reservation));
    }

    #[test]
    fn take_draft_removes_it() {
        let mut session = SessionData::default();
        session.set_draft(draft());

        assert_eq!(session.take_draft().unwrap(), draft());
        assert!(!session.exists(SessionKey::Reservation));
    }

    #[test]
    fn notices_are_one_shot() {
        let mut session = SessionData::default();
        session.set_notice(SessionKey::Flash, "Logged in successfully.");

        assert_eq!(
            session.pop_notice(SessionKey::Flash).as_deref(),
            Some("Logged in successfully.")
        );
        assert_eq!(session.pop_notice(SessionKey::Flash), None);
    }

    #[test]
    fn user_id_round_trips() {
        let mut session = SessionData::default();
        assert_eq!(session.user_id(), None);
        session.put(SessionKey::UserId, SessionValue::User(UserId::new(7)));
        assert_eq!(session.user_id(), Some(UserId::new(7)));
    }

    #[test]
    fn generated_tokens_differ() {
        assert_ne!(SessionToken::generate(), SessionToken::generate());
    }
}
