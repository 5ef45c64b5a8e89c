//! In-memory [`SessionStore`].

use bookings_core::session::{SessionFuture, SessionStore};
use bookings_core::{SessionData, SessionToken};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// `HashMap`-backed session store honouring TTLs on tokio's clock.
///
/// Expiry uses [`tokio::time::Instant`], so tests can advance time with
/// `tokio::time::advance` under a paused runtime.
#[derive(Clone, Debug, Default)]
pub struct MemorySessionStore {
    sessions: Arc<Mutex<HashMap<SessionToken, (SessionData, Instant)>>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.sessions
            .lock()
            .unwrap()
            .values()
            .filter(|(_, expires)| *expires > now)
            .count()
    }

    /// `true` if no live session exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Peek at a stored session without touching its expiry.
    #[must_use]
    pub fn snapshot(&self, token: &SessionToken) -> Option<SessionData> {
        let now = Instant::now();
        self.sessions
            .lock()
            .unwrap()
            .get(token)
            .filter(|(_, expires)| *expires > now)
            .map(|(data, _)| data.clone())
    }
}

impl SessionStore for MemorySessionStore {
    fn load<'a>(&'a self, token: &'a SessionToken) -> SessionFuture<'a, Option<SessionData>> {
        Box::pin(async move {
            let now = Instant::now();
            let mut sessions = self.sessions.lock().unwrap();
            match sessions.get(token) {
                Some((data, expires)) if *expires > now => Ok(Some(data.clone())),
                Some(_) => {
                    sessions.remove(token);
                    Ok(None)
                }
                None => Ok(None),
            }
        })
    }

    fn save<'a>(
        &'a self,
        token: &'a SessionToken,
        data: &'a SessionData,
        ttl: Duration,
    ) -> SessionFuture<'a, ()> {
        Box::pin(async move {
            self.sessions
                .lock()
                .unwrap()
                .insert(token.clone(), (data.clone(), Instant::now() + ttl));
            Ok(())
        })
    }

    fn destroy<'a>(&'a self, token: &'a SessionToken) -> SessionFuture<'a, ()> {
        Box::pin(async move {
            self.sessions.lock().unwrap().remove(token);
            Ok(())
        })
    }
}
