//! [`ReservationRepository`] on `PostgreSQL`.

use crate::error;
use crate::rows::{AccountRow, ReservationRow, RestrictionRow, RoomRow};
use bookings_core::{
    Account, NewAccount, NewReservation, RepoFuture, RepositoryError, Reservation,
    ReservationId, ReservationRepository, RestrictionKind, Room, RoomId, RoomRestriction,
    StayDates, UserId,
};
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;

const INSERT_RESERVATION: &str = r"
    INSERT INTO reservations (first_name, last_name, email, phone, start_date, end_date, room_id)
    VALUES ($1, $2, $3, $4, $5, $6, $7)
    RETURNING id
";

const INSERT_RESTRICTION: &str = r"
    INSERT INTO room_restrictions (start_date, end_date, room_id, reservation_id, restriction_id)
    VALUES ($1, $2, $3, $4, $5)
";

/// Half-open overlap: `$2` is the stay's start, `$3` its end.
const COUNT_OVERLAPPING: &str = r"
    SELECT count(*)
    FROM room_restrictions
    WHERE room_id = $1 AND $2 < end_date AND $3 > start_date
";

const SELECT_RESERVATION_BY_ID: &str = r"
    SELECT r.id, r.first_name, r.last_name, r.email, r.phone, r.start_date, r.end_date,
           r.processed, r.room_id, rm.room_name
    FROM reservations r
    JOIN rooms rm ON rm.id = r.room_id
    WHERE r.id = $1
";

const SELECT_RESERVATIONS_BY_EMAIL: &str = r"
    SELECT r.id, r.first_name, r.last_name, r.email, r.phone, r.start_date, r.end_date,
           r.processed, r.room_id, rm.room_name
    FROM reservations r
    JOIN rooms rm ON rm.id = r.room_id
    WHERE lower(r.email) = lower($1)
    ORDER BY r.start_date, r.id
";

const SELECT_ACCOUNT_BY_EMAIL: &str = r"
    SELECT id, first_name, last_name, email, password, access_level
    FROM users
    WHERE lower(email) = lower($1)
";

const SELECT_ACCOUNT_BY_ID: &str = r"
    SELECT id, first_name, last_name, email, password, access_level
    FROM users
    WHERE id = $1
";

/// Connection pool settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Connection string.
    pub url: String,
    /// Upper bound on open connections.
    pub max_connections: u32,
    /// Connections kept open while idle.
    pub min_connections: u32,
    /// How long to wait for a connection.
    pub connect_timeout: Duration,
}

impl PoolConfig {
    /// 10 max, 2 min, 30 second connect timeout.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 2,
            connect_timeout: Duration::from_secs(30),
        }
    }

    /// Set the pool bounds.
    #[must_use]
    pub const fn with_connections(mut self, min: u32, max: u32) -> Self {
        self.min_connections = min;
        self.max_connections = max;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Production repository.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Query`] if the database is unreachable.
    pub async fn connect(config: &PoolConfig) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .connect(&config.url)
            .await
            .map_err(|e| error::query("Failed to connect", &e))?;
        tracing::info!(max_connections = config.max_connections, "Connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    /// Apply the bundled migrations.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Persistence`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RepositoryError::Persistence(format!("Migration failed: {e}")))
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn count_overlapping<'e, E>(executor: E, room_id: RoomId, stay: StayDates) -> Result<i64, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        sqlx::query_scalar(COUNT_OVERLAPPING)
            .bind(room_id.value())
            .bind(stay.start())
            .bind(stay.end())
            .fetch_one(executor)
            .await
    }

    async fn commit_in_transaction(
        tx: &mut Transaction<'static, Postgres>,
        reservation: &NewReservation,
    ) -> Result<ReservationId, RepositoryError> {
        let room_id = reservation.room_id;

        // Serialise bookings of this room until the transaction ends.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(room_id.value())
            .execute(&mut **tx)
            .await
            .map_err(|e| error::write("Failed to lock room", &e))?;

        let clashes = Self::count_overlapping(&mut **tx, room_id, reservation.stay)
            .await
            .map_err(|e| error::query("Failed to re-check availability", &e))?;
        if clashes > 0 {
            tracing::info!(room_id = %room_id, stay = %reservation.stay, "Room taken before commit");
            return Err(RepositoryError::Conflict);
        }

        let guest = &reservation.guest;
        let id: i64 = sqlx::query_scalar(INSERT_RESERVATION)
            .bind(&guest.first_name)
            .bind(&guest.last_name)
            .bind(&guest.email)
            .bind(&guest.phone)
            .bind(reservation.stay.start())
            .bind(reservation.stay.end())
            .bind(room_id.value())
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| error::write("Failed to insert reservation", &e))?;

        let hold = RoomRestriction::hold(room_id, reservation.stay, ReservationId::new(id));
        bind_restriction(sqlx::query(INSERT_RESTRICTION), &hold)
            .execute(&mut **tx)
            .await
            .map_err(|e| error::write("Failed to insert reservation hold", &e))?;

        Ok(ReservationId::new(id))
    }
}

fn bind_restriction<'q>(
    query: sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>,
    restriction: &RoomRestriction,
) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(restriction.stay.start())
        .bind(restriction.stay.end())
        .bind(restriction.room_id.value())
        .bind(restriction.reservation_id.map(ReservationId::value))
        .bind(restriction.kind.id())
}

impl ReservationRepository for PostgresRepository {
    fn insert_reservation<'a>(&'a self, reservation: &'a NewReservation) -> RepoFuture<'a, ReservationId> {
        Box::pin(async move {
            let guest = &reservation.guest;
            let id: i64 = sqlx::query_scalar(INSERT_RESERVATION)
                .bind(&guest.first_name)
                .bind(&guest.last_name)
                .bind(&guest.email)
                .bind(&guest.phone)
                .bind(reservation.stay.start())
                .bind(reservation.stay.end())
                .bind(reservation.room_id.value())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| error::write("Failed to insert reservation", &e))?;
            Ok(ReservationId::new(id))
        })
    }

    fn insert_room_restriction<'a>(&'a self, restriction: &'a RoomRestriction) -> RepoFuture<'a, ()> {
        Box::pin(async move {
            bind_restriction(sqlx::query(INSERT_RESTRICTION), restriction)
                .execute(&self.pool)
                .await
                .map_err(|e| error::write("Failed to insert room restriction", &e))?;
            Ok(())
        })
    }

    fn delete_reservation(&self, id: ReservationId) -> RepoFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("DELETE FROM reservations WHERE id = $1")
                .bind(id.value())
                .execute(&self.pool)
                .await
                .map_err(|e| error::write("Failed to delete reservation", &e))?;
            Ok(())
        })
    }

    fn commit_reservation<'a>(&'a self, reservation: &'a NewReservation) -> RepoFuture<'a, ReservationId> {
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| error::write("Failed to begin transaction", &e))?;

            // Dropping `tx` on the error path rolls everything back.
            let id = Self::commit_in_transaction(&mut tx, reservation)
                .await
                .inspect_err(|_| metrics::counter!("bookings.storage.rollbacks").increment(1))?;

            tx.commit()
                .await
                .map_err(|e| error::write("Failed to commit reservation", &e))?;
            tracing::debug!(reservation_id = %id, "Reservation and hold committed");
            Ok(id)
        })
    }

    fn search_availability_by_dates_by_room_id(&self, stay: StayDates, room_id: RoomId) -> RepoFuture<'_, bool> {
        Box::pin(async move {
            let clashes = Self::count_overlapping(&self.pool, room_id, stay)
                .await
                .map_err(|e| error::query("Failed to check room availability", &e))?;
            Ok(clashes == 0)
        })
    }

    fn search_availability_for_all_rooms(&self, stay: StayDates) -> RepoFuture<'_, Vec<Room>> {
        Box::pin(async move {
            let rows: Vec<RoomRow> = sqlx::query_as(
                r"
                SELECT rm.id, rm.room_name
                FROM rooms rm
                WHERE NOT EXISTS (
                    SELECT 1 FROM room_restrictions rr
                    WHERE rr.room_id = rm.id AND $1 < rr.end_date AND $2 > rr.start_date
                )
                ORDER BY rm.room_name, rm.id
                ",
            )
            .bind(stay.start())
            .bind(stay.end())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| error::query("Failed to search availability", &e))?;
            Ok(rows.into_iter().map(Room::from).collect())
        })
    }

    fn all_rooms(&self) -> RepoFuture<'_, Vec<Room>> {
        Box::pin(async move {
            let rows: Vec<RoomRow> = sqlx::query_as("SELECT id, room_name FROM rooms ORDER BY room_name, id")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| error::query("Failed to list rooms", &e))?;
            Ok(rows.into_iter().map(Room::from).collect())
        })
    }

    fn get_room_by_id(&self, id: RoomId) -> RepoFuture<'_, Room> {
        Box::pin(async move {
            let row: RoomRow = sqlx::query_as("SELECT id, room_name FROM rooms WHERE id = $1")
                .bind(id.value())
                .fetch_one(&self.pool)
                .await
                .map_err(error::not_found("room"))?;
            Ok(row.into())
        })
    }

    fn restrictions_for_room(&self, room_id: RoomId, stay: StayDates) -> RepoFuture<'_, Vec<RoomRestriction>> {
        Box::pin(async move {
            let rows: Vec<RestrictionRow> = sqlx::query_as(
                r"
                SELECT room_id, start_date, end_date, restriction_id, reservation_id
                FROM room_restrictions
                WHERE room_id = $1 AND $2 < end_date AND $3 > start_date
                ORDER BY start_date, id
                ",
            )
            .bind(room_id.value())
            .bind(stay.start())
            .bind(stay.end())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| error::query("Failed to list restrictions", &e))?;
            rows.into_iter().map(RoomRestriction::try_from).collect()
        })
    }

    fn delete_owner_block(&self, room_id: RoomId, day: NaiveDate) -> RepoFuture<'_, ()> {
        Box::pin(async move {
            let deleted = sqlx::query(
                r"
                DELETE FROM room_restrictions
                WHERE room_id = $1 AND start_date = $2 AND restriction_id = $3
                ",
            )
            .bind(room_id.value())
            .bind(day)
            .bind(RestrictionKind::OwnerBlock.id())
            .execute(&self.pool)
            .await
            .map_err(|e| error::write("Failed to delete owner block", &e))?;
            if deleted.rows_affected() == 0 {
                return Err(RepositoryError::not_found("owner block"));
            }
            Ok(())
        })
    }

    fn get_reservation_by_id(&self, id: ReservationId) -> RepoFuture<'_, Reservation> {
        Box::pin(async move {
            let row: ReservationRow = sqlx::query_as(SELECT_RESERVATION_BY_ID)
                .bind(id.value())
                .fetch_one(&self.pool)
                .await
                .map_err(error::not_found("reservation"))?;
            row.try_into()
        })
    }

    fn get_reservations_by_email<'a>(&'a self, email: &'a str) -> RepoFuture<'a, Vec<Reservation>> {
        Box::pin(async move {
            let rows: Vec<ReservationRow> = sqlx::query_as(SELECT_RESERVATIONS_BY_EMAIL)
            .bind(email)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| error::query("Failed to list reservations", &e))?;
            rows.into_iter().map(Reservation::try_from).collect()
        })
    }

    fn get_user_by_email<'a>(&'a self, email: &'a str) -> RepoFuture<'a, Account> {
        Box::pin(async move {
            let row: AccountRow = sqlx::query_as(SELECT_ACCOUNT_BY_EMAIL)
                .bind(email)
                .fetch_one(&self.pool)
                .await
                .map_err(error::not_found("user"))?;
            Ok(row.into())
        })
    }

    fn get_user_by_id(&self, id: UserId) -> RepoFuture<'_, Account> {
        Box::pin(async move {
            let row: AccountRow = sqlx::query_as(SELECT_ACCOUNT_BY_ID)
                .bind(id.value())
                .fetch_one(&self.pool)
                .await
                .map_err(error::not_found("user"))?;
            Ok(row.into())
        })
    }

    fn create_user<'a>(&'a self, account: &'a NewAccount) -> RepoFuture<'a, UserId> {
        Box::pin(async move {
            let id: i64 = sqlx::query_scalar(
                r"
                INSERT INTO users (first_name, last_name, email, password, access_level)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id
                ",
            )
            .bind(&account.first_name)
            .bind(&account.last_name)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(account.access_level)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| error::account_write("Failed to create user", &e))?;
            Ok(UserId::new(id))
        })
    }

    fn ping(&self) -> RepoFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(|e| error::query("Database ping failed", &e))?;
            Ok(())
        })
    }
}
