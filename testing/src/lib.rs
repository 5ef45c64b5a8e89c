//! # Bookings Testing
//!
//! Test doubles and helpers shared by the crates in this workspace.
//!
//! This crate provides:
//! - [`TestRepository`]: deterministic in-memory storage with fixed failure triggers
//! - [`MemorySessionStore`]: TTL-aware in-memory session store
//! - [`RecordingNotifier`]: captures queued notifications
//! - [`fixtures`]: canned stays and form submissions
//! - [`properties`]: proptest strategies for domain types
//!
//! ## Example
//!
//! ```
//! use bookings_testing::{RecordingNotifier, TestRepository, fixtures};
//! use bookings_core::{BookingFlow, MailConfig, SessionData};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let repo = TestRepository::new();
//! let flow = BookingFlow::new(
//!     Arc::new(repo.clone()),
//!     Arc::new(RecordingNotifier::new()),
//!     MailConfig::default(),
//! );
//!
//! let mut session = SessionData::default();
//! let rooms = flow.search(&mut session, "2050-01-01", "2050-01-02").await.unwrap();
//! assert_eq!(rooms[0].name, "General's Quarters");
//! # let _ = fixtures::guest_form();
//! # }
//! ```

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

pub mod notifier;
pub mod repository;
pub mod session;

pub use notifier::RecordingNotifier;
pub use repository::TestRepository;
pub use session::MemorySessionStore;

/// Canned inputs for the booking scenarios.
pub mod fixtures {
    use bookings_core::StayDates;
    use std::collections::HashMap;

    /// Arrival day used across scenarios.
    pub const START: &str = "2050-01-01";
    /// Checkout day used across scenarios.
    pub const END: &str = "2050-01-02";

    /// The one-night stay `START .. END`.
    #[must_use]
    pub fn stay() -> StayDates {
        StayDates::parse(START, END).unwrap()
    }

    /// A valid reservation form submission.
    #[must_use]
    pub fn guest_form() -> HashMap<String, String> {
        form(&[
            ("first_name", "John"),
            ("last_name", "Smith"),
            ("email", "john@smith.com"),
            ("phone", "555-555-5555"),
        ])
    }

    /// Build submitted form values from literal pairs.
    #[must_use]
    pub fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use bookings_core::StayDates;
    use chrono::{Days, NaiveDate};
    use proptest::prelude::*;

    /// Stays of one to fourteen nights starting within `days` of 2050-01-01.
    pub fn stay_within(days: u64) -> impl Strategy<Value = StayDates> {
        (0..days, 1u64..15).prop_map(|(offset, nights)| {
            let base = NaiveDate::from_ymd_opt(2050, 1, 1).unwrap();
            let start = base.checked_add_days(Days::new(offset)).unwrap();
            let end = start.checked_add_days(Days::new(nights)).unwrap();
            StayDates::new(start, end).unwrap()
        })
    }
}

/// Install a `fmt` subscriber honouring `RUST_LOG`, once per process.
///
/// Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}
