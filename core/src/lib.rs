//! # Bookings Core
//!
//! Domain types and the booking workflow for a small guest house.
//!
//! A visitor searches for free rooms, picks one, enters contact details and
//! commits a reservation. The steps span several HTTP requests, so the
//! in-progress reservation lives in the visitor's session as a
//! [`DraftReservation`] that only moves forward.
//!
//! ## Modules
//!
//! - [`types`]: identifiers, rooms, stays, reservations, accounts
//! - [`forms`]: accumulating form validation
//! - [`availability`]: overlap rules and the availability engine
//! - [`draft`]: the reservation draft state machine
//! - [`session`]: typed session entries and the session store trait
//! - [`repository`]: the storage boundary
//! - [`notification`]: mail descriptions and the notifier trait
//! - [`booking`]: [`BookingFlow`], which ties the above together
//!
//! Storage, delivery and HTTP live in sibling crates; this crate only
//! defines the traits they implement.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod availability;
pub mod booking;
pub mod draft;
pub mod error;
pub mod forms;
pub mod notification;
pub mod repository;
pub mod session;
pub mod types;

pub use availability::AvailabilityEngine;
pub use booking::BookingFlow;
pub use draft::{DraftReservation, DraftStage};
pub use error::{BookingError, RepositoryError, Result, SessionError};
pub use forms::{Form, FormErrors};
pub use notification::{EnqueueOutcome, MailConfig, MailData, Notifier, SharedNotifier};
pub use repository::{RepoFuture, ReservationRepository, SharedRepository};
pub use session::{SessionData, SessionKey, SessionStore, SessionToken, SessionValue};
pub use types::{
    Account, GuestDetails, NewAccount, NewReservation, Reservation, ReservationId,
    RestrictionKind, Room, RoomId, RoomRestriction, StayDates, UserId,
};
