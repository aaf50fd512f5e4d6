//! Repository port and its PostgreSQL implementation
//!
//! [`BookingRepository`] is the persistence contract of the booking core:
//! typed CRUD and availability queries, no business rules, no retry and no
//! caching. [`Repository`] implements it on PostgreSQL, [`MemoryRepository`]
//! in memory for tests and local runs. The composition root picks one.

pub mod memory;
pub mod reservations;
pub mod restrictions;
pub mod rooms;
pub mod users;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        GuestDetails, NewReservation, NewRoomRestriction, ReservationWithRoom, Room,
        RoomRestriction, User,
    },
};

pub use memory::MemoryRepository;

/// Persistence contract shared by the database and in-memory variants.
///
/// Date ranges are half-open: `start` is occupied, `end` is not.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Fetch a room, `AppError::NotFound` if it does not exist
    async fn get_room_by_id(&self, id: i32) -> AppResult<Room>;

    /// All rooms ordered by id
    async fn all_rooms(&self) -> AppResult<Vec<Room>>;

    /// Insert a reservation and return its new id
    async fn insert_reservation(&self, reservation: &NewReservation) -> AppResult<i32>;

    /// Insert a restriction; fails when the room does not exist
    async fn insert_room_restriction(&self, restriction: &NewRoomRestriction) -> AppResult<()>;

    /// Rooms with no restriction overlapping `[start, end)`, ordered by id.
    /// An empty list means "no availability", not an error.
    async fn search_availability_for_all_rooms(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<Room>>;

    /// Whether no restriction of `room_id` overlaps `[start, end)`
    async fn has_availability_by_dates_by_room_id(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        room_id: i32,
    ) -> AppResult<bool>;

    /// Restrictions of `room_id` overlapping `[start, end)`, ordered by start date
    async fn get_room_restrictions_for_room_by_date(
        &self,
        room_id: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<RoomRestriction>>;

    /// Insert a one-day manual block starting on `date`
    async fn insert_block_for_room_restriction(&self, room_id: i32, date: NaiveDate) -> AppResult<()>;

    /// Delete a manual block by restriction id
    async fn delete_block_by_id(&self, id: i32) -> AppResult<()>;

    async fn all_reservations(&self) -> AppResult<Vec<ReservationWithRoom>>;

    /// Reservations not yet processed by staff
    async fn all_new_reservations(&self) -> AppResult<Vec<ReservationWithRoom>>;

    async fn get_reservation_by_id(&self, id: i32) -> AppResult<ReservationWithRoom>;

    /// Overwrite the guest fields of a reservation
    async fn update_reservation(&self, id: i32, guest: &GuestDetails) -> AppResult<()>;

    /// Delete a reservation together with its restriction
    async fn delete_reservation(&self, id: i32) -> AppResult<()>;

    async fn update_processed_for_reservation(&self, id: i32, processed: i32) -> AppResult<()>;

    /// Staff account lookup for login
    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
}

/// PostgreSQL-backed repository holding the connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for Repository {
    async fn get_room_by_id(&self, id: i32) -> AppResult<Room> {
        self.rooms_get_by_id(id).await
    }

    async fn all_rooms(&self) -> AppResult<Vec<Room>> {
        self.rooms_list().await
    }

    async fn insert_reservation(&self, reservation: &NewReservation) -> AppResult<i32> {
        self.reservations_insert(reservation).await
    }

    async fn insert_room_restriction(&self, restriction: &NewRoomRestriction) -> AppResult<()> {
        self.restrictions_insert(restriction).await
    }

    async fn search_availability_for_all_rooms(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<Room>> {
        self.rooms_available(start, end).await
    }

    async fn has_availability_by_dates_by_room_id(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        room_id: i32,
    ) -> AppResult<bool> {
        let overlapping = self.restrictions_count_overlapping(room_id, start, end).await?;
        Ok(overlapping == 0)
    }

    async fn get_room_restrictions_for_room_by_date(
        &self,
        room_id: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<RoomRestriction>> {
        self.restrictions_for_room(room_id, start, end).await
    }

    async fn insert_block_for_room_restriction(&self, room_id: i32, date: NaiveDate) -> AppResult<()> {
        self.restrictions_insert_block(room_id, date).await
    }

    async fn delete_block_by_id(&self, id: i32) -> AppResult<()> {
        self.restrictions_delete_block(id).await
    }

    async fn all_reservations(&self) -> AppResult<Vec<ReservationWithRoom>> {
        self.reservations_list(false).await
    }

    async fn all_new_reservations(&self) -> AppResult<Vec<ReservationWithRoom>> {
        self.reservations_list(true).await
    }

    async fn get_reservation_by_id(&self, id: i32) -> AppResult<ReservationWithRoom> {
        self.reservations_get_by_id(id).await
    }

    async fn update_reservation(&self, id: i32, guest: &GuestDetails) -> AppResult<()> {
        self.reservations_update(id, guest).await
    }

    async fn delete_reservation(&self, id: i32) -> AppResult<()> {
        self.reservations_delete(id).await
    }

    async fn update_processed_for_reservation(&self, id: i32, processed: i32) -> AppResult<()> {
        self.reservations_set_processed(id, processed).await
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.users_get_by_email(email).await
    }
}
