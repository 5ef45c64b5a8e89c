//! Row shapes returned by the queries and their conversion to domain types.

use bookings_core::{
    Account, GuestDetails, RepositoryError, Reservation, ReservationId, RestrictionKind, Room,
    RoomId, RoomRestriction, StayDates, UserId,
};
use chrono::NaiveDate;

fn stay(start: NaiveDate, end: NaiveDate) -> Result<StayDates, RepositoryError> {
    StayDates::new(start, end)
        .map_err(|e| RepositoryError::Query(format!("stored dates are invalid: {e}")))
}

#[derive(sqlx::FromRow)]
pub(crate) struct RoomRow {
    id: i64,
    room_name: String,
}

impl From<RoomRow> for Room {
    fn from(row: RoomRow) -> Self {
        Self::new(RoomId::new(row.id), row.room_name)
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct RestrictionRow {
    room_id: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    restriction_id: i32,
    reservation_id: Option<i64>,
}

impl TryFrom<RestrictionRow> for RoomRestriction {
    type Error = RepositoryError;

    fn try_from(row: RestrictionRow) -> Result<Self, Self::Error> {
        let kind = RestrictionKind::from_id(row.restriction_id).ok_or_else(|| {
            RepositoryError::Query(format!("unknown restriction kind {}", row.restriction_id))
        })?;
        Ok(Self {
            room_id: RoomId::new(row.room_id),
            stay: stay(row.start_date, row.end_date)?,
            kind,
            reservation_id: row.reservation_id.map(ReservationId::new),
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ReservationRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    processed: bool,
    room_id: i64,
    room_name: String,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = RepositoryError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ReservationId::new(row.id),
            guest: GuestDetails {
                first_name: row.first_name,
                last_name: row.last_name,
                email: row.email,
                phone: row.phone,
            },
            stay: stay(row.start_date, row.end_date)?,
            room: Room::new(RoomId::new(row.room_id), row.room_name),
            processed: row.processed,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct AccountRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    password: String,
    access_level: i32,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: UserId::new(row.id),
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            password_hash: row.password,
            access_level: row.access_level,
        }
    }
}
