//! `PostgreSQL` storage for the bookings site.
//!
//! [`PostgresRepository`] implements
//! [`ReservationRepository`](bookings_core::ReservationRepository) over a
//! sqlx connection pool:
//!
//! - Reservation and hold are written in one transaction
//! - Concurrent bookings of the same room are serialised with a
//!   transaction-scoped advisory lock, and the availability check is
//!   repeated under that lock
//! - An exclusion constraint on `room_restrictions` backs this up at the
//!   storage level
//! - `users.email` is unique (case-insensitive), and a violation is reported
//!   as [`RepositoryError::DuplicateEmail`](bookings_core::RepositoryError)
//!
//! # Example
//!
//! ```ignore
//! use bookings_postgres::{PoolConfig, PostgresRepository};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = PostgresRepository::connect(&PoolConfig::new("postgres://localhost/bookings")).await?;
//!     repo.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod repository;
mod rows;

pub use repository::{PoolConfig, PostgresRepository};
