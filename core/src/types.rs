//! Domain types shared by every layer of the booking system.
//!
//! Identifiers are newtypes over `i64` so a room id can never be passed
//! where a reservation id is expected. Date ranges are always half-open:
//! a [`StayDates`] of `2050-01-01 .. 2050-01-02` is one night, and the end
//! date is the checkout day.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Wire format of every date accepted from or rendered to a visitor.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw database identifier.
            #[must_use]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// The raw identifier.
            #[must_use]
            pub const fn value(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(
    /// Identifier of a bookable room.
    RoomId
);
id_newtype!(
    /// Identifier of a persisted reservation.
    ReservationId
);
id_newtype!(
    /// Identifier of a registered account.
    UserId
);

/// A bookable room from the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Room identifier.
    pub id: RoomId,
    /// Display name, e.g. "General's Quarters".
    pub name: String,
}

impl Room {
    /// Create a room.
    #[must_use]
    pub fn new(id: RoomId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Error parsing or constructing a [`StayDates`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    /// A date did not match `YYYY-MM-DD`.
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    Malformed(String),

    /// The checkout day is not after the arrival day.
    #[error("end date {end} must be after start date {start}")]
    EmptyRange {
        /// Arrival day.
        start: NaiveDate,
        /// Checkout day.
        end: NaiveDate,
    },
}

/// Parse a single `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns [`DateError::Malformed`] when the input is not a calendar date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, DateError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| DateError::Malformed(raw.to_string()))
}

/// A half-open stay interval `[start, end)`.
///
/// # Examples
///
/// ```
/// use bookings_core::types::StayDates;
///
/// let stay = StayDates::parse("2050-01-01", "2050-01-03").unwrap();
/// assert_eq!(stay.nights(), 2);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StayDates {
    start: NaiveDate,
    end: NaiveDate,
}

impl StayDates {
    /// Build a stay from two dates.
    ///
    /// # Errors
    ///
    /// Returns [`DateError::EmptyRange`] if `end <= start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateError> {
        if end <= start {
            return Err(DateError::EmptyRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse a stay from two `YYYY-MM-DD` strings.
    ///
    /// # Errors
    ///
    /// Returns [`DateError`] if either date is malformed or the range is empty.
    pub fn parse(start: &str, end: &str) -> Result<Self, DateError> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// A single night starting on `day`, as used by owner blocks.
    ///
    /// Returns `None` only for the last representable calendar day.
    #[must_use]
    pub fn single_night(day: NaiveDate) -> Option<Self> {
        day.checked_add_days(Days::new(1))
            .map(|end| Self { start: day, end })
    }

    /// Arrival day (inclusive).
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Checkout day (exclusive).
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of nights covered.
    #[must_use]
    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Whether two stays share at least one night.
    ///
    /// Touching intervals (one ends the day the other starts) do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for StayDates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

/// Why a room is unavailable for an interval.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RestrictionKind {
    /// Nights held by a committed reservation.
    ReservationHold,
    /// Nights blocked by the property owner.
    OwnerBlock,
}

impl RestrictionKind {
    /// Catalog identifier stored in the `restrictions` table.
    #[must_use]
    pub const fn id(self) -> i32 {
        match self {
            Self::ReservationHold => 1,
            Self::OwnerBlock => 2,
        }
    }

    /// Inverse of [`RestrictionKind::id`].
    #[must_use]
    pub const fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(Self::ReservationHold),
            2 => Some(Self::OwnerBlock),
            _ => None,
        }
    }
}

/// A persisted claim on a room for an interval.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRestriction {
    /// Room the restriction applies to.
    pub room_id: RoomId,
    /// Blocked nights.
    pub stay: StayDates,
    /// Hold or owner block.
    pub kind: RestrictionKind,
    /// Present exactly when `kind` is [`RestrictionKind::ReservationHold`].
    pub reservation_id: Option<ReservationId>,
}

impl RoomRestriction {
    /// The hold written alongside a committed reservation.
    #[must_use]
    pub const fn hold(room_id: RoomId, stay: StayDates, reservation_id: ReservationId) -> Self {
        Self {
            room_id,
            stay,
            kind: RestrictionKind::ReservationHold,
            reservation_id: Some(reservation_id),
        }
    }

    /// An owner block with no reservation behind it.
    #[must_use]
    pub const fn owner_block(room_id: RoomId, stay: StayDates) -> Self {
        Self {
            room_id,
            stay,
            kind: RestrictionKind::OwnerBlock,
            reservation_id: None,
        }
    }
}

/// Contact details captured from the reservation form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestDetails {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Address confirmations are sent to.
    pub email: String,
    /// Optional phone number, free-form.
    pub phone: String,
}

/// Everything needed to persist a reservation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReservation {
    /// Guest contact details.
    pub guest: GuestDetails,
    /// Booked nights.
    pub stay: StayDates,
    /// Booked room.
    pub room_id: RoomId,
}

/// A persisted reservation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Reservation identifier.
    pub id: ReservationId,
    /// Guest contact details.
    pub guest: GuestDetails,
    /// Booked nights.
    pub stay: StayDates,
    /// Booked room, including its display name.
    pub room: Room,
    /// Whether the owner has processed the reservation.
    pub processed: bool,
}

/// Default access level granted at registration.
pub const DEFAULT_ACCESS_LEVEL: i32 = 1;

/// A registered account as stored by the repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account identifier.
    pub id: UserId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Unique login email.
    pub email: String,
    /// PHC-formatted password hash.
    pub password_hash: String,
    /// Authorization level.
    pub access_level: i32,
}

/// Fields needed to create an account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewAccount {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Unique login email.
    pub email: String,
    /// PHC-formatted password hash, never the plaintext.
    pub password_hash: String,
    /// Authorization level.
    pub access_level: i32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn stay(start: &str, end: &str) -> StayDates {
        StayDates::parse(start, end).unwrap()
    }

    #[test]
    fn touching_stays_do_not_overlap() {
        let a = stay("2050-01-01", "2050-01-03");
        let b = stay("2050-01-03", "2050-01-05");
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn shared_night_overlaps() {
        let a = stay("2050-01-01", "2050-01-03");
        let b = stay("2050-01-02", "2050-01-04");
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn contained_stay_overlaps() {
        let outer = stay("2050-01-01", "2050-01-10");
        let inner = stay("2050-01-04", "2050-01-05");
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn empty_range_is_rejected() {
        assert!(matches!(
            StayDates::parse("2050-01-02", "2050-01-02"),
            Err(DateError::EmptyRange { .. })
        ));
        assert!(matches!(
            StayDates::parse("2050-01-03", "2050-01-02"),
            Err(DateError::EmptyRange { .. })
        ));
    }

    #[test]
    fn malformed_date_is_rejected() {
        assert_eq!(
            StayDates::parse("01/02/2050", "2050-01-03"),
            Err(DateError::Malformed("01/02/2050".to_string()))
        );
    }

    #[test]
    fn single_night_spans_one_day() {
        let day = parse_date("2050-06-30").unwrap();
        let night = StayDates::single_night(day).unwrap();
        assert_eq!(night.nights(), 1);
        assert_eq!(night.end(), parse_date("2050-07-01").unwrap());
    }

    #[test]
    fn restriction_kind_ids_round_trip() {
        for kind in [RestrictionKind::ReservationHold, RestrictionKind::OwnerBlock] {
            assert_eq!(RestrictionKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(RestrictionKind::from_id(7), None);
    }

    #[test]
    fn display_uses_wire_format() {
        assert_eq!(
            stay("2050-01-01", "2050-01-02").to_string(),
            "2050-01-01 to 2050-01-02"
        );
    }
}
