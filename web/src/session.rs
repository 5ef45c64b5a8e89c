//! Visitor sessions over HTTP.
//!
//! The session layer maps the session cookie to a [`SessionData`] held in a
//! [`SessionStore`]. For every request it:
//!
//! 1. **Reads** the token from the cookie, or mints a fresh one
//! 2. **Locks** the token so requests from the same visitor run one at a time
//! 3. **Loads** the session and hands it to the handler as a [`Session`]
//! 4. **Saves** it back with a fresh TTL and sets the cookie on the response
//!
//! Handlers rotate the token with [`SessionState::renew`] (sign-in) or wipe
//! the session with [`SessionState::destroy`] (sign-out); the old token is
//! deleted from the store when the response is written.

use crate::error::AppError;
use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum::async_trait;
use bookings_core::{SessionData, SessionError, SessionStore, SessionToken};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};
use tower::{Layer, Service};

/// Session cookie settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Name of the cookie carrying the token.
    ///
    /// Default: `bookings_session`
    pub cookie_name: String,

    /// Inactivity lifetime. Every request restarts it.
    ///
    /// Default: 24 hours
    pub ttl: Duration,

    /// Whether the cookie is sent over HTTPS only.
    ///
    /// Default: `false`
    pub secure: bool,
}

impl SessionConfig {
    /// Create configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cookie_name: "bookings_session".to_string(),
            ttl: Duration::from_secs(24 * 60 * 60),
            secure: false,
        }
    }

    /// Set the cookie name.
    #[must_use]
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Set the inactivity lifetime.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Mark the cookie `Secure`.
    #[must_use]
    pub const fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// `Set-Cookie` value for `token`.
    fn cookie(&self, token: &SessionToken) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.cookie_name,
            token,
            self.ttl.as_secs()
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// The token in the request's cookies, if it looks like one we issued.
    fn token_from(&self, headers: &HeaderMap) -> Option<SessionToken> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value)
            .filter(|value| is_token(value))
            .map(SessionToken::new)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Tokens are 32 lowercase hex digits; anything else is ignored.
fn is_token(value: &str) -> bool {
    value.len() == 32 && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// One lock per live session token.
///
/// Entries nobody holds or waits on are pruned on the next acquisition.
#[derive(Clone, Debug, Default)]
pub struct SessionLocks {
    locks: Arc<std::sync::Mutex<HashMap<SessionToken, Arc<Mutex<()>>>>>,
}

impl SessionLocks {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other request holds `token`, then hold it until the
    /// guard is dropped.
    pub async fn acquire(&self, token: &SessionToken) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(token.clone()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of tokens currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// `true` if no token is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared session machinery: the store, cookie settings and lock table.
#[derive(Clone)]
pub struct Sessions {
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
    locks: SessionLocks,
}

impl Sessions {
    /// Create session machinery over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self {
            store,
            config,
            locks: SessionLocks::new(),
        }
    }

    /// Cookie settings.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Layer that runs [`Session`] handling around every request.
    #[must_use]
    pub fn layer(&self) -> SessionLayer {
        SessionLayer {
            sessions: self.clone(),
        }
    }

    /// Check that the store answers, by reading a token no cookie can carry.
    ///
    /// # Errors
    ///
    /// Returns the store's error if it cannot be reached.
    pub async fn ping(&self) -> Result<(), SessionError> {
        self.store
            .load(&SessionToken::new("readiness-probe"))
            .await
            .map(|_| ())
    }

    /// Load the session for `token`, or start an empty one.
    ///
    /// A session that cannot be decoded is discarded and replaced under a
    /// new token.
    async fn open(&self, token: Option<SessionToken>) -> Result<SessionState, SessionError> {
        let Some(token) = token else {
            return Ok(SessionState::fresh());
        };

        match self.store.load(&token).await {
            Ok(Some(data)) => Ok(SessionState::existing(token, data)),
            Ok(None) => Ok(SessionState::existing(token, SessionData::default())),
            Err(SessionError::Corrupt(reason)) => {
                tracing::warn!(%reason, "Discarding undecodable session");
                let mut state = SessionState::existing(token, SessionData::default());
                state.renew();
                Ok(state)
            }
            Err(error) => Err(error),
        }
    }

    /// Persist `state`, deleting a rotated-out token first.
    async fn close(&self, state: &SessionState) {
        if let Some(retired) = &state.retired {
            if let Err(error) = self.store.destroy(retired).await {
                tracing::error!(error = %error, "Failed to delete retired session");
            }
        }
        if let Err(error) = self.store.save(&state.token, &state.data, self.config.ttl).await {
            tracing::error!(error = %error, "Failed to save session");
        }
    }
}

/// One visitor's session for the duration of a request.
pub struct SessionState {
    token: SessionToken,
    data: SessionData,
    retired: Option<SessionToken>,
}

impl SessionState {
    fn fresh() -> Self {
        Self::existing(SessionToken::generate(), SessionData::default())
    }

    const fn existing(token: SessionToken, data: SessionData) -> Self {
        Self {
            token,
            data,
            retired: None,
        }
    }

    /// The token the response cookie will carry.
    #[must_use]
    pub const fn token(&self) -> &SessionToken {
        &self.token
    }

    /// Move the session to a new token, keeping its data.
    pub fn renew(&mut self) {
        let previous = std::mem::replace(&mut self.token, SessionToken::generate());
        self.retired.get_or_insert(previous);
    }

    /// Drop everything in the session and move to a new token.
    pub fn destroy(&mut self) {
        self.data = SessionData::default();
        self.renew();
    }
}

impl Deref for SessionState {
    type Target = SessionData;

    fn deref(&self) -> &SessionData {
        &self.data
    }
}

impl DerefMut for SessionState {
    fn deref_mut(&mut self) -> &mut SessionData {
        &mut self.data
    }
}

/// Handle to the current request's session.
///
/// Extracted by handlers; requires [`SessionLayer`].
///
/// ```ignore
/// async fn handler(session: Session) -> Response {
///     let mut session = session.lock().await;
///     session.set_notice(SessionKey::Flash, "Saved");
///     Redirect::to("/").into_response()
/// }
/// ```
#[derive(Clone)]
pub struct Session(Arc<Mutex<SessionState>>);

impl Session {
    /// Borrow the session state.
    pub async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.0.lock().await
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| AppError::internal("Session layer not installed"))
    }
}

/// Layer for session handling.
#[derive(Clone)]
pub struct SessionLayer {
    sessions: Sessions,
}

impl<S> Layer<S> for SessionLayer {
    type Service = SessionMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionMiddleware {
            inner,
            sessions: self.sessions.clone(),
        }
    }
}

/// Middleware service for session handling.
#[derive(Clone)]
pub struct SessionMiddleware<S> {
    inner: S,
    sessions: Sessions,
}

impl<S> Service<Request> for SessionMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        // The clone is not ready; keep the one that is.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let sessions = self.sessions.clone();

        Box::pin(async move {
            let token = sessions.config.token_from(req.headers());
            let _guard = match &token {
                Some(token) => Some(sessions.locks.acquire(token).await),
                None => None,
            };

            let state = match sessions.open(token).await {
                Ok(state) => state,
                Err(error) => {
                    return Ok(AppError::unavailable("Session storage unavailable")
                        .with_source(anyhow::Error::new(error))
                        .into_response());
                }
            };

            let session = Session(Arc::new(Mutex::new(state)));
            req.extensions_mut().insert(session.clone());

            let mut response = inner.call(req).await?;

            let state = session.lock().await;
            sessions.close(&state).await;

            match HeaderValue::from_str(&sessions.config.cookie(&state.token)) {
                Ok(cookie) => {
                    response.headers_mut().append(header::SET_COOKIE, cookie);
                }
                Err(error) => tracing::error!(error = %error, "Session cookie is not a valid header"),
            }

            Ok(response)
        })
    }
}
