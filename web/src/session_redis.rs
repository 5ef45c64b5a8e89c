//! Redis-based session store.
//!
//! Sessions are stored under `session:{token}` as bincode-encoded
//! [`SessionData`] with a TTL that every save restarts, so a session lives
//! for the configured lifetime after the visitor's last request.
//!
//! # Example
//!
//! ```no_run
//! use bookings_web::session_redis::RedisSessionStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisSessionStore::new("redis://127.0.0.1:6379").await?;
//! # Ok(())
//! # }
//! ```

use bookings_core::session::SessionFuture;
use bookings_core::{SessionData, SessionError, SessionStore, SessionToken};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;

/// Redis-based session store with TTL-based expiration.
#[derive(Clone)]
pub struct RedisSessionStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisSessionStore {
    /// Create a new Redis session store.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://127.0.0.1:6379")
    ///
    /// # Errors
    ///
    /// [`SessionError::Unavailable`] if Redis cannot be reached.
    pub async fn new(redis_url: &str) -> Result<Self, SessionError> {
        let client = Client::open(redis_url).map_err(|e| {
            SessionError::Unavailable(format!("Failed to create Redis client: {e}"))
        })?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            SessionError::Unavailable(format!("Failed to create Redis connection manager: {e}"))
        })?;

        Ok(Self { conn_manager })
    }

    /// Check that Redis answers.
    ///
    /// # Errors
    ///
    /// [`SessionError::Unavailable`] if the ping fails.
    pub async fn ping(&self) -> Result<(), SessionError> {
        let mut conn = self.conn_manager.clone();
        let _pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| SessionError::Unavailable(format!("Redis ping failed: {e}")))?;
        Ok(())
    }

    /// Get the Redis key for a session.
    fn session_key(token: &SessionToken) -> String {
        format!("session:{token}")
    }
}

impl SessionStore for RedisSessionStore {
    fn load<'a>(&'a self, token: &'a SessionToken) -> SessionFuture<'a, Option<SessionData>> {
        Box::pin(async move {
            let mut conn = self.conn_manager.clone();
            let bytes: Option<Vec<u8>> = conn
                .get(Self::session_key(token))
                .await
                .map_err(|e| SessionError::Unavailable(format!("Failed to load session: {e}")))?;

            bytes
                .map(|bytes| {
                    bincode::deserialize(&bytes).map_err(|e| SessionError::Corrupt(e.to_string()))
                })
                .transpose()
        })
    }

    fn save<'a>(
        &'a self,
        token: &'a SessionToken,
        data: &'a SessionData,
        ttl: Duration,
    ) -> SessionFuture<'a, ()> {
        Box::pin(async move {
            let bytes =
                bincode::serialize(data).map_err(|e| SessionError::Corrupt(e.to_string()))?;

            // Redis rejects a zero expiry.
            let ttl_seconds = ttl.as_secs().max(1);

            let mut conn = self.conn_manager.clone();
            let () = conn
                .set_ex(Self::session_key(token), bytes, ttl_seconds)
                .await
                .map_err(|e| SessionError::Unavailable(format!("Failed to save session: {e}")))?;

            tracing::trace!(ttl_seconds, "Saved session");
            Ok(())
        })
    }

    fn destroy<'a>(&'a self, token: &'a SessionToken) -> SessionFuture<'a, ()> {
        Box::pin(async move {
            let mut conn = self.conn_manager.clone();
            let () = conn
                .del(Self::session_key(token))
                .await
                .map_err(|e| SessionError::Unavailable(format!("Failed to delete session: {e}")))?;
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bookings_core::{DraftReservation, SessionKey, StayDates};

    #[test]
    fn session_keys_are_namespaced() {
        let token = SessionToken::new("0123456789abcdef0123456789abcdef");
        assert_eq!(
            RedisSessionStore::session_key(&token),
            "session:0123456789abcdef0123456789abcdef"
        );
    }

    #[test]
    fn session_data_survives_bincode() {
        let mut data = SessionData::default();
        data.set_draft(DraftReservation::book_room(
            StayDates::parse("2050-01-01", "2050-01-02").unwrap(),
            bookings_core::RoomId::new(1),
        ));
        data.set_notice(SessionKey::Flash, "Logged in successfully.");

        let bytes = bincode::serialize(&data).unwrap();
        let decoded: SessionData = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn garbage_does_not_decode() {
        let decoded = bincode::deserialize::<SessionData>(&[0xff, 0xff, 0xff]);
        assert!(decoded.is_err());
    }
}
