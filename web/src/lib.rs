//! HTTP surface for the bookings site.
//!
//! This crate is the imperative shell around the booking workflow in
//! `bookings-core` and the accounts in `bookings-auth`: it decodes forms,
//! keeps the visitor's session, and turns workflow outcomes into rendered
//! pages or redirects.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         HTTP shell (Axum)               │  ← forms, cookies, redirects
//! │  - Correlation + session layers         │  ← one request per session at a time
//! │  - Handlers                             │  ← notices + 303 on workflow errors
//! ├─────────────────────────────────────────┤
//! │         Booking workflow                │
//! │  - Draft state machine                  │  ← lives in the session
//! │  - Availability + commit                │  ← repository behind a trait
//! │  - Notifications                        │  ← bounded dispatcher
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Request Flow
//!
//! 1. **Correlate**: the request gets a correlation id and a tracing span
//! 2. **Load session**: the cookie's session is locked and loaded
//! 3. **Run handler**: the workflow advances the draft held in the session
//! 4. **Respond**: a rendered view, or a 303 redirect with a notice
//! 5. **Save session**: the session is written back and the cookie refreshed
//!
//! # Example
//!
//! ```ignore
//! use bookings_web::{AppState, build_router, JsonRenderer, Sessions, SessionConfig};
//!
//! let sessions = Sessions::new(Arc::new(store), SessionConfig::default());
//! let state = AppState::new(flow, accounts, sessions, Arc::new(JsonRenderer));
//! let app = build_router(state);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod session_redis;
pub mod state;
pub mod view;

// Re-export key types for convenience
pub use config::Config;
pub use error::AppError;
pub use extractors::ClientIp;
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use routes::build_router;
pub use session::{Session, SessionConfig, Sessions};
pub use session_redis::RedisSessionStore;
pub use state::AppState;
pub use view::{JsonRenderer, Renderer, TemplateData};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
