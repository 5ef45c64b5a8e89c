//! Availability checks over the repository.
//!
//! A room is available for a stay when no restriction on it (hold or owner
//! block) shares a night with the stay. Overlap is evaluated on half-open
//! intervals, see [`StayDates::overlaps`].

use crate::error::{BookingError, Result};
use crate::repository::{RepoFuture, SharedRepository};
use crate::types::{Room, RoomId, StayDates};
use std::time::Duration;

/// Await a repository call, failing with [`BookingError::Timeout`] once
/// `limit` has elapsed.
pub(crate) async fn bounded<T>(
    operation: &'static str,
    limit: Duration,
    call: RepoFuture<'_, T>,
) -> Result<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(BookingError::from),
        Err(_) => {
            tracing::warn!(operation, timeout = ?limit, "Storage call timed out");
            Err(BookingError::Timeout { operation })
        }
    }
}

/// Answers "is this room free" and "which rooms are free" for a stay.
#[derive(Clone)]
pub struct AvailabilityEngine {
    repo: SharedRepository,
    timeout: Duration,
}

impl AvailabilityEngine {
    /// Create an engine; every lookup is bounded by `timeout`.
    #[must_use]
    pub fn new(repo: SharedRepository, timeout: Duration) -> Self {
        Self { repo, timeout }
    }

    /// Whether `room_id` has no restriction overlapping `stay`.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Query`] if the lookup fails
    /// - [`BookingError::Timeout`] if it does not finish in time
    pub async fn is_room_available(&self, room_id: RoomId, stay: StayDates) -> Result<bool> {
        bounded(
            "availability_by_room",
            self.timeout,
            self.repo.search_availability_by_dates_by_room_id(stay, room_id),
        )
        .await
    }

    /// Rooms free for the whole stay, ordered by name. Empty when nothing is
    /// free.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Query`] if the lookup fails
    /// - [`BookingError::Timeout`] if it does not finish in time
    pub async fn search_available_rooms(&self, stay: StayDates) -> Result<Vec<Room>> {
        let mut rooms = bounded(
            "availability_all_rooms",
            self.timeout,
            self.repo.search_availability_for_all_rooms(stay),
        )
        .await?;

        rooms.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        rooms.dedup_by_key(|room| room.id);
        tracing::debug!(%stay, found = rooms.len(), "Availability search");
        Ok(rooms)
    }
}
