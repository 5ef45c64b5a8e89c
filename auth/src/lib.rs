//! # Bookings Accounts
//!
//! Email and password accounts for the bookings site.
//!
//! - [`AccountService::register`] validates a sign-up form, rejects taken
//!   emails and stores an Argon2id hash of the password.
//! - [`AccountService::authenticate`] checks an email and password. Unknown
//!   emails and wrong passwords are distinct errors internally but share one
//!   visitor-facing message.
//!
//! ## Example
//!
//! ```rust,ignore
//! use bookings_auth::{AccountConfig, AccountService};
//!
//! let accounts = AccountService::new(repo, AccountConfig::default())?;
//! let user_id = accounts.authenticate("me@here.com", "Secret1!").await?;
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

pub mod accounts;
pub mod config;
pub mod constants;
pub mod error;
pub mod password;

pub use accounts::AccountService;
pub use config::{AccountConfig, HashingConfig};
pub use error::{AuthError, Result};
pub use password::Passwords;
