//! Storage boundary for rooms, restrictions, reservations and accounts.
//!
//! # Implementations
//!
//! - `PostgresRepository` (in `bookings-postgres`): production storage
//! - `TestRepository` (in `bookings-testing`): deterministic double for tests
//!
//! # Dyn Compatibility
//!
//! Methods return `Pin<Box<dyn Future>>` rather than using `async fn` so the
//! repository can be shared as `Arc<dyn ReservationRepository>` across
//! handlers and background tasks.

use crate::error::RepositoryError;
use crate::types::{
    Account, NewAccount, NewReservation, Reservation, ReservationId, Room, RoomId,
    RoomRestriction, StayDates, UserId,
};
use chrono::NaiveDate;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by every repository method.
pub type RepoFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RepositoryError>> + Send + 'a>>;

/// Shared handle to a repository implementation.
pub type SharedRepository = Arc<dyn ReservationRepository>;

/// Persistence operations used by the booking workflow.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one instance serves every request.
pub trait ReservationRepository: Send + Sync {
    /// Insert a reservation row and return its id.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Persistence`] if the write fails.
    fn insert_reservation<'a>(&'a self, reservation: &'a NewReservation)
    -> RepoFuture<'a, ReservationId>;

    /// Insert a room restriction row.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Persistence`] if the write fails.
    fn insert_room_restriction<'a>(&'a self, restriction: &'a RoomRestriction) -> RepoFuture<'a, ()>;

    /// Delete a reservation row. Used to undo a half-written commit.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Persistence`] if the delete fails.
    fn delete_reservation(&self, id: ReservationId) -> RepoFuture<'_, ()>;

    /// Persist a reservation together with the hold on its room, as one unit.
    ///
    /// Either both rows exist afterwards or neither does. The default
    /// implementation writes the reservation, then the hold, and deletes the
    /// reservation again if the hold cannot be written. Stores with
    /// transactions should override this.
    ///
    /// # Errors
    ///
    /// - [`RepositoryError::Persistence`] if either write fails
    /// - [`RepositoryError::Conflict`] if the room was claimed concurrently
    fn commit_reservation<'a>(
        &'a self,
        reservation: &'a NewReservation,
    ) -> RepoFuture<'a, ReservationId> {
        Box::pin(async move {
            let id = self.insert_reservation(reservation).await?;
            let hold = RoomRestriction::hold(reservation.room_id, reservation.stay, id);

            if let Err(error) = self.insert_room_restriction(&hold).await {
                if let Err(undo) = self.delete_reservation(id).await {
                    tracing::error!(
                        reservation_id = %id,
                        error = %undo,
                        "Failed to roll back reservation after hold insert failed"
                    );
                }
                return Err(error);
            }

            Ok(id)
        })
    }

    /// `true` when no restriction on `room_id` overlaps `stay`.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Query`] if the lookup fails.
    fn search_availability_by_dates_by_room_id(
        &self,
        stay: StayDates,
        room_id: RoomId,
    ) -> RepoFuture<'_, bool>;

    /// Every room with no restriction overlapping `stay`.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Query`] if the lookup fails.
    fn search_availability_for_all_rooms(&self, stay: StayDates) -> RepoFuture<'_, Vec<Room>>;

    /// The full room catalog ordered by name.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Query`] if the lookup fails.
    fn all_rooms(&self) -> RepoFuture<'_, Vec<Room>>;

    /// Look up one room.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] for an unknown id.
    fn get_room_by_id(&self, id: RoomId) -> RepoFuture<'_, Room>;

    /// Restrictions on `room_id` that overlap `stay`, ordered by start date.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Query`] if the lookup fails.
    fn restrictions_for_room(
        &self,
        room_id: RoomId,
        stay: StayDates,
    ) -> RepoFuture<'_, Vec<RoomRestriction>>;

    /// Block one night of `room_id` on behalf of the owner.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Persistence`] if the write fails.
    fn insert_owner_block(&self, room_id: RoomId, day: NaiveDate) -> RepoFuture<'_, ()> {
        Box::pin(async move {
            let night = StayDates::single_night(day).ok_or_else(|| {
                RepositoryError::Persistence(format!("cannot block the night after {day}"))
            })?;
            self.insert_room_restriction(&RoomRestriction::owner_block(room_id, night))
                .await
        })
    }

    /// Lift the owner block on `room_id` for the night of `day`.
    ///
    /// # Errors
    ///
    /// - [`RepositoryError::NotFound`] if the owner never blocked that night
    /// - [`RepositoryError::Persistence`] if the write fails
    fn delete_owner_block(&self, room_id: RoomId, day: NaiveDate) -> RepoFuture<'_, ()>;

    /// Look up a reservation with its room.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] for an unknown id.
    fn get_reservation_by_id(&self, id: ReservationId) -> RepoFuture<'_, Reservation>;

    /// Reservations booked under `email`, ordered by start date.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Query`] if the lookup fails.
    fn get_reservations_by_email<'a>(&'a self, email: &'a str) -> RepoFuture<'a, Vec<Reservation>>;

    /// Look up an account by login email.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] when no account uses `email`.
    fn get_user_by_email<'a>(&'a self, email: &'a str) -> RepoFuture<'a, Account>;

    /// Look up an account by id.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] for an unknown id.
    fn get_user_by_id(&self, id: UserId) -> RepoFuture<'_, Account>;

    /// Create an account.
    ///
    /// # Errors
    ///
    /// - [`RepositoryError::DuplicateEmail`] if the email is taken
    /// - [`RepositoryError::Persistence`] if the write fails
    fn create_user<'a>(&'a self, account: &'a NewAccount) -> RepoFuture<'a, UserId>;

    /// Cheap round trip used by readiness checks.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Query`] if the store is unreachable.
    fn ping(&self) -> RepoFuture<'_, ()>;
}
