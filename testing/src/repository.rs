//! Deterministic in-memory [`ReservationRepository`].
//!
//! Availability is computed from the restrictions written so far, so the
//! double behaves like a real store for the happy path. Failure paths are
//! triggered by fixed inputs instead of configuration:
//!
//! | Call                                        | Fails when                       |
//! |---------------------------------------------|----------------------------------|
//! | `insert_reservation`                        | room is [`FAIL_RESERVATION_ROOM`]  |
//! | `insert_room_restriction`                   | room is [`FAIL_RESTRICTION_ROOM`]  |
//! | `search_availability_by_dates_by_room_id`   | room is [`FAIL_RESTRICTION_ROOM`]  |
//! | `search_availability_for_all_rooms`         | stay starts on [`FAIL_SEARCH_DATE`] |
//! | `create_user`                               | first name is [`FAIL_USER_NAME`]   |

use bookings_core::repository::{RepoFuture, ReservationRepository};
use bookings_core::{
    Account, NewAccount, NewReservation, RepositoryError, Reservation, ReservationId,
    RestrictionKind, Room, RoomId, RoomRestriction, StayDates, UserId,
};
use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// "General's Quarters".
pub const GENERALS_QUARTERS: RoomId = RoomId::new(1);
/// "Major's Suite".
pub const MAJORS_SUITE: RoomId = RoomId::new(2);
/// Reservation inserts for this room fail.
pub const FAIL_RESERVATION_ROOM: RoomId = MAJORS_SUITE;
/// Restriction inserts and per-room availability lookups for this room fail.
/// The room is not in the catalog.
pub const FAIL_RESTRICTION_ROOM: RoomId = RoomId::new(3);
/// First name that makes `create_user` fail.
pub const FAIL_USER_NAME: &str = "Error";

/// Start date that makes the all-rooms availability search fail.
#[must_use]
pub fn fail_search_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2060, 1, 1).unwrap()
}

/// See [`fail_search_date`].
pub const FAIL_SEARCH_DATE: &str = "2060-01-01";

#[derive(Debug, Default)]
struct State {
    rooms: Vec<Room>,
    reservations: Vec<Reservation>,
    restrictions: Vec<RoomRestriction>,
    accounts: Vec<Account>,
    next_reservation_id: i64,
    next_user_id: i64,
}

impl State {
    fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.iter().find(|room| room.id == id)
    }

    fn is_free(&self, room_id: RoomId, stay: &StayDates) -> bool {
        !self
            .restrictions
            .iter()
            .any(|r| r.room_id == room_id && r.stay.overlaps(stay))
    }
}

/// In-memory repository with fixed failure triggers.
///
/// # Example
///
/// ```
/// use bookings_testing::TestRepository;
/// use bookings_core::ReservationRepository;
///
/// # async fn example() {
/// let repo = TestRepository::new();
/// let rooms = repo.all_rooms().await.unwrap();
/// assert_eq!(rooms.len(), 2);
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct TestRepository {
    state: Arc<Mutex<State>>,
    latency: Option<Duration>,
    offline: Arc<AtomicBool>,
}

impl Default for TestRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRepository {
    /// A repository holding the two-room catalog and nothing else.
    #[must_use]
    pub fn new() -> Self {
        let state = State {
            rooms: vec![
                Room::new(GENERALS_QUARTERS, "General's Quarters"),
                Room::new(MAJORS_SUITE, "Major's Suite"),
            ],
            next_reservation_id: 1,
            next_user_id: 1,
            ..State::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            latency: None,
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Delay every call by `latency`. Pair with paused tokio time to test
    /// timeouts.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Seed an account.
    #[must_use]
    pub fn with_account(
        self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password_hash: &str,
    ) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let id = UserId::new(state.next_user_id);
            state.next_user_id += 1;
            state.accounts.push(Account {
                id,
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                access_level: bookings_core::types::DEFAULT_ACCESS_LEVEL,
            });
        }
        self
    }

    /// Make `ping` fail, as if the store were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Every reservation written so far.
    #[must_use]
    pub fn reservations(&self) -> Vec<Reservation> {
        self.state.lock().unwrap().reservations.clone()
    }

    /// Every restriction written so far.
    #[must_use]
    pub fn restrictions(&self) -> Vec<RoomRestriction> {
        self.state.lock().unwrap().restrictions.clone()
    }

    /// Every account.
    #[must_use]
    pub fn accounts(&self) -> Vec<Account> {
        self.state.lock().unwrap().accounts.clone()
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl ReservationRepository for TestRepository {
    fn insert_reservation<'a>(
        &'a self,
        reservation: &'a NewReservation,
    ) -> RepoFuture<'a, ReservationId> {
        Box::pin(async move {
            self.delay().await;
            if reservation.room_id == FAIL_RESERVATION_ROOM {
                return Err(RepositoryError::Persistence(
                    "error inserting reservation".to_string(),
                ));
            }

            let mut state = self.state.lock().unwrap();
            let room = state
                .room(reservation.room_id)
                .cloned()
                .unwrap_or_else(|| Room::new(reservation.room_id, String::new()));
            let id = ReservationId::new(state.next_reservation_id);
            state.next_reservation_id += 1;
            state.reservations.push(Reservation {
                id,
                guest: reservation.guest.clone(),
                stay: reservation.stay,
                room,
                processed: false,
            });
            Ok(id)
        })
    }

    fn insert_room_restriction<'a>(
        &'a self,
        restriction: &'a RoomRestriction,
    ) -> RepoFuture<'a, ()> {
        Box::pin(async move {
            self.delay().await;
            if restriction.room_id == FAIL_RESTRICTION_ROOM {
                return Err(RepositoryError::Persistence(
                    "error inserting room restriction".to_string(),
                ));
            }
            self.state
                .lock()
                .unwrap()
                .restrictions
                .push(restriction.clone());
            Ok(())
        })
    }

    fn delete_reservation(&self, id: ReservationId) -> RepoFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.reservations.retain(|r| r.id != id);
            state.restrictions.retain(|r| r.reservation_id != Some(id));
            Ok(())
        })
    }

    fn search_availability_by_dates_by_room_id(
        &self,
        stay: StayDates,
        room_id: RoomId,
    ) -> RepoFuture<'_, bool> {
        Box::pin(async move {
            self.delay().await;
            if room_id == FAIL_RESTRICTION_ROOM {
                return Err(RepositoryError::Query(
                    "error searching availability".to_string(),
                ));
            }
            Ok(self.state.lock().unwrap().is_free(room_id, &stay))
        })
    }

    fn search_availability_for_all_rooms(&self, stay: StayDates) -> RepoFuture<'_, Vec<Room>> {
        Box::pin(async move {
            self.delay().await;
            if stay.start() == fail_search_date() {
                return Err(RepositoryError::Query(
                    "error searching availability".to_string(),
                ));
            }
            let state = self.state.lock().unwrap();
            Ok(state
                .rooms
                .iter()
                .filter(|room| state.is_free(room.id, &stay))
                .cloned()
                .collect())
        })
    }

    fn all_rooms(&self) -> RepoFuture<'_, Vec<Room>> {
        Box::pin(async move {
            self.delay().await;
            let mut rooms = self.state.lock().unwrap().rooms.clone();
            rooms.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(rooms)
        })
    }

    fn get_room_by_id(&self, id: RoomId) -> RepoFuture<'_, Room> {
        Box::pin(async move {
            self.delay().await;
            self.state
                .lock()
                .unwrap()
                .room(id)
                .cloned()
                .ok_or_else(|| RepositoryError::not_found("room"))
        })
    }

    fn restrictions_for_room(
        &self,
        room_id: RoomId,
        stay: StayDates,
    ) -> RepoFuture<'_, Vec<RoomRestriction>> {
        Box::pin(async move {
            self.delay().await;
            let mut found: Vec<RoomRestriction> = self
                .state
                .lock()
                .unwrap()
                .restrictions
                .iter()
                .filter(|r| r.room_id == room_id && r.stay.overlaps(&stay))
                .cloned()
                .collect();
            found.sort_by_key(|r| r.stay.start());
            Ok(found)
        })
    }

    fn delete_owner_block(&self, room_id: RoomId, day: NaiveDate) -> RepoFuture<'_, ()> {
        Box::pin(async move {
            self.delay().await;
            let mut state = self.state.lock().unwrap();
            let before = state.restrictions.len();
            state.restrictions.retain(|r| {
                !(r.room_id == room_id
                    && r.kind == RestrictionKind::OwnerBlock
                    && r.stay.start() == day)
            });
            if state.restrictions.len() == before {
                return Err(RepositoryError::not_found("owner block"));
            }
            Ok(())
        })
    }

    fn get_reservation_by_id(&self, id: ReservationId) -> RepoFuture<'_, Reservation> {
        Box::pin(async move {
            self.delay().await;
            self.state
                .lock()
                .unwrap()
                .reservations
                .iter()
                .find(|r| r.id == id)
                .cloned()
                .ok_or_else(|| RepositoryError::not_found("reservation"))
        })
    }

    fn get_reservations_by_email<'a>(
        &'a self,
        email: &'a str,
    ) -> RepoFuture<'a, Vec<Reservation>> {
        Box::pin(async move {
            self.delay().await;
            let mut found: Vec<Reservation> = self
                .state
                .lock()
                .unwrap()
                .reservations
                .iter()
                .filter(|r| r.guest.email.eq_ignore_ascii_case(email))
                .cloned()
                .collect();
            found.sort_by_key(|r| r.stay.start());
            Ok(found)
        })
    }

    fn get_user_by_email<'a>(&'a self, email: &'a str) -> RepoFuture<'a, Account> {
        Box::pin(async move {
            self.delay().await;
            self.state
                .lock()
                .unwrap()
                .accounts
                .iter()
                .find(|a| a.email.eq_ignore_ascii_case(email))
                .cloned()
                .ok_or_else(|| RepositoryError::not_found("user"))
        })
    }

    fn get_user_by_id(&self, id: UserId) -> RepoFuture<'_, Account> {
        Box::pin(async move {
            self.delay().await;
            self.state
                .lock()
                .unwrap()
                .accounts
                .iter()
                .find(|a| a.id == id)
                .cloned()
                .ok_or_else(|| RepositoryError::not_found("user"))
        })
    }

    fn create_user<'a>(&'a self, account: &'a NewAccount) -> RepoFuture<'a, UserId> {
        Box::pin(async move {
            self.delay().await;
            if account.first_name == FAIL_USER_NAME {
                return Err(RepositoryError::Persistence(
                    "error creating user".to_string(),
                ));
            }

            let mut state = self.state.lock().unwrap();
            if state
                .accounts
                .iter()
                .any(|a| a.email.eq_ignore_ascii_case(&account.email))
            {
                return Err(RepositoryError::DuplicateEmail);
            }
            let id = UserId::new(state.next_user_id);
            state.next_user_id += 1;
            state.accounts.push(Account {
                id,
                first_name: account.first_name.clone(),
                last_name: account.last_name.clone(),
                email: account.email.clone(),
                password_hash: account.password_hash.clone(),
                access_level: account.access_level,
            });
            Ok(id)
        })
    }

    fn ping(&self) -> RepoFuture<'_, ()> {
        Box::pin(async move {
            if self.offline.load(Ordering::SeqCst) {
                return Err(RepositoryError::Query("store offline".to_string()));
            }
            Ok(())
        })
    }
}
