//! The reservation draft state machine.
//!
//! ```text
//!  (empty) ──search──▶ DatesSelected ──choose_room──▶ RoomSelected
//!     │                                                 │     ▲
//!     └────────────────book_room───────────────────────▶┘     │ validation failed
//!                                                       │     │
//!                                              capture_details
//!                                                       ▼
//!                                               DetailsCaptured ──commit──▶ Committed
//! ```
//!
//! "Empty" is the absence of a draft in the session. Every transition
//! consumes the draft and either yields the next stage or fails with
//! [`BookingError::MissingContext`]; there is no way back to an earlier
//! stage except starting over with a new search or direct booking.

use crate::error::BookingError;
use crate::types::{GuestDetails, NewReservation, ReservationId, Room, RoomId, StayDates};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which step of the flow a draft has reached.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DraftStage {
    /// Dates chosen, candidate rooms listed.
    DatesSelected,
    /// A room is picked; guest details may be partially typed.
    RoomSelected,
    /// Guest details validated; ready to persist.
    DetailsCaptured,
    /// Persisted. Only the summary view may read it.
    Committed,
}

impl fmt::Display for DraftStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DatesSelected => "dates_selected",
            Self::RoomSelected => "room_selected",
            Self::DetailsCaptured => "details_captured",
            Self::Committed => "committed",
        };
        f.write_str(name)
    }
}

/// A reservation being assembled across several requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DraftReservation {
    /// Dates chosen, candidate rooms listed.
    DatesSelected {
        /// Requested nights.
        stay: StayDates,
        /// Rooms that were free when the search ran.
        candidates: Vec<Room>,
    },
    /// A room is picked.
    RoomSelected {
        /// Requested nights.
        stay: StayDates,
        /// Picked room.
        room_id: RoomId,
        /// Resolved once the reservation form has been shown.
        room_name: Option<String>,
        /// Whatever the visitor typed last, kept across failed submissions.
        guest: GuestDetails,
    },
    /// Guest details validated.
    DetailsCaptured {
        /// Requested nights.
        stay: StayDates,
        /// Picked room.
        room_id: RoomId,
        /// Resolved room name, if known.
        room_name: Option<String>,
        /// Validated guest details.
        guest: GuestDetails,
    },
    /// Persisted.
    Committed {
        /// Booked nights.
        stay: StayDates,
        /// Booked room.
        room: Room,
        /// Guest details as persisted.
        guest: GuestDetails,
        /// Id assigned by the repository.
        reservation_id: ReservationId,
    },
}

fn out_of_order(expected: &str, found: DraftStage) -> BookingError {
    tracing::debug!(%found, expected, "Draft transition out of order");
    BookingError::missing_context(crate::session::MSG_NO_DRAFT)
}

impl DraftReservation {
    /// Start a draft from an availability search.
    #[must_use]
    pub fn dates_selected(stay: StayDates, candidates: Vec<Room>) -> Self {
        Self::DatesSelected { stay, candidates }
    }

    /// Start a draft directly at a room, skipping the search page.
    #[must_use]
    pub fn book_room(stay: StayDates, room_id: RoomId) -> Self {
        Self::RoomSelected {
            stay,
            room_id,
            room_name: None,
            guest: GuestDetails::default(),
        }
    }

    /// Current stage.
    #[must_use]
    pub const fn stage(&self) -> DraftStage {
        match self {
            Self::DatesSelected { .. } => DraftStage::DatesSelected,
            Self::RoomSelected { .. } => DraftStage::RoomSelected,
            Self::DetailsCaptured { .. } => DraftStage::DetailsCaptured,
            Self::Committed { .. } => DraftStage::Committed,
        }
    }

    /// Requested nights, available at every stage.
    #[must_use]
    pub const fn stay(&self) -> StayDates {
        match self {
            Self::DatesSelected { stay, .. }
            | Self::RoomSelected { stay, .. }
            | Self::DetailsCaptured { stay, .. }
            | Self::Committed { stay, .. } => *stay,
        }
    }

    /// The picked room, once there is one.
    #[must_use]
    pub const fn room_id(&self) -> Option<RoomId> {
        match self {
            Self::DatesSelected { .. } => None,
            Self::RoomSelected { room_id, .. } | Self::DetailsCaptured { room_id, .. } => {
                Some(*room_id)
            }
            Self::Committed { room, .. } => Some(room.id),
        }
    }

    /// Guest details typed so far. Empty before a room is picked.
    #[must_use]
    pub fn guest(&self) -> Option<&GuestDetails> {
        match self {
            Self::DatesSelected { .. } => None,
            Self::RoomSelected { guest, .. }
            | Self::DetailsCaptured { guest, .. }
            | Self::Committed { guest, .. } => Some(guest),
        }
    }

    /// Pick one of the listed rooms.
    ///
    /// # Errors
    ///
    /// [`BookingError::MissingContext`] unless the draft is at
    /// [`DraftStage::DatesSelected`] and `room_id` was among its candidates.
    pub fn choose_room(self, room_id: RoomId) -> Result<Self, BookingError> {
        match self {
            Self::DatesSelected { stay, candidates } => {
                let room = candidates.into_iter().find(|room| room.id == room_id);
                match room {
                    Some(room) => Ok(Self::RoomSelected {
                        stay,
                        room_id,
                        room_name: Some(room.name),
                        guest: GuestDetails::default(),
                    }),
                    None => Err(BookingError::missing_context("Can't find room")),
                }
            }
            other => Err(out_of_order("dates_selected", other.stage())),
        }
    }

    /// Attach the room's display name once it has been looked up.
    #[must_use]
    pub fn with_room_name(mut self, name: impl Into<String>) -> Self {
        if let Self::RoomSelected { room_name, .. } | Self::DetailsCaptured { room_name, .. } =
            &mut self
        {
            *room_name = Some(name.into());
        }
        self
    }

    /// Keep what the visitor typed after a failed submission, staying at
    /// [`DraftStage::RoomSelected`].
    ///
    /// # Errors
    ///
    /// [`BookingError::MissingContext`] unless a room has been picked and the
    /// draft is not yet committed.
    pub fn retain_typed(self, typed: GuestDetails) -> Result<Self, BookingError> {
        match self {
            Self::RoomSelected {
                stay,
                room_id,
                room_name,
                ..
            }
            | Self::DetailsCaptured {
                stay,
                room_id,
                room_name,
                ..
            } => Ok(Self::RoomSelected {
                stay,
                room_id,
                room_name,
                guest: typed,
            }),
            other => Err(out_of_order("room_selected", other.stage())),
        }
    }

    /// Record validated guest details.
    ///
    /// A draft already at [`DraftStage::DetailsCaptured`] (a previous commit
    /// attempt failed) accepts new details in place.
    ///
    /// # Errors
    ///
    /// [`BookingError::MissingContext`] before a room is picked or after commit.
    pub fn capture_details(self, guest: GuestDetails) -> Result<Self, BookingError> {
        match self {
            Self::RoomSelected {
                stay,
                room_id,
                room_name,
                ..
            }
            | Self::DetailsCaptured {
                stay,
                room_id,
                room_name,
                ..
            } => Ok(Self::DetailsCaptured {
                stay,
                room_id,
                room_name,
                guest,
            }),
            other => Err(out_of_order("room_selected", other.stage())),
        }
    }

    /// The row the repository should write for this draft.
    ///
    /// # Errors
    ///
    /// [`BookingError::MissingContext`] unless the draft is at
    /// [`DraftStage::DetailsCaptured`].
    pub fn to_new_reservation(&self) -> Result<NewReservation, BookingError> {
        match self {
            Self::DetailsCaptured {
                stay,
                room_id,
                guest,
                ..
            } => Ok(NewReservation {
                guest: guest.clone(),
                stay: *stay,
                room_id: *room_id,
            }),
            other => Err(out_of_order("details_captured", other.stage())),
        }
    }

    /// Mark the draft as persisted.
    ///
    /// # Errors
    ///
    /// [`BookingError::MissingContext`] unless the draft is at
    /// [`DraftStage::DetailsCaptured`].
    pub fn commit(self, reservation_id: ReservationId, room: Room) -> Result<Self, BookingError> {
        match self {
            Self::DetailsCaptured { stay, guest, .. } => Ok(Self::Committed {
                stay,
                room,
                guest,
                reservation_id,
            }),
            other => Err(out_of_order("details_captured", other.stage())),
        }
    }
}
