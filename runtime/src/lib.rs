//! # Bookings Runtime
//!
//! Out-of-band delivery of the emails a booking produces.
//!
//! ## Core Components
//!
//! - **Dispatcher**: bounded queue plus a worker pool, exposed to the
//!   workflow as a [`bookings_core::Notifier`]
//! - **Email providers**: SMTP through `lettre`, or a console logger for
//!   development
//! - **Retry**: exponential backoff for transient transport failures
//! - **Metrics**: Prometheus export of the booking counters
//!
//! ## Example
//!
//! ```ignore
//! use bookings_runtime::{ConsoleEmailProvider, DispatcherConfig, NotificationDispatcher};
//!
//! let (notifier, workers) =
//!     NotificationDispatcher::start(ConsoleEmailProvider::new(), DispatcherConfig::default());
//! let flow = BookingFlow::new(repo, Arc::new(notifier), MailConfig::default());
//! // ...
//! workers.shutdown(Duration::from_secs(5)).await;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Background delivery queue
pub mod dispatcher;
/// Email provider trait and layouts
pub mod email;
/// Delivery error types
pub mod error;
/// Prometheus metrics export
pub mod metrics;
/// Retry logic with exponential backoff
pub mod retry;

mod console_email;
mod smtp_email;

/// Test doubles
#[cfg(feature = "test-utils")]
pub mod mocks;

pub use console_email::ConsoleEmailProvider;
pub use dispatcher::{DispatcherConfig, DispatcherWorkers, NotificationDispatcher};
pub use email::EmailProvider;
pub use error::{DeliveryError, Result};
pub use retry::RetryPolicy;
pub use smtp_email::{SmtpConfig, SmtpEmailProvider, build_message};
