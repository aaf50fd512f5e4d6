//! In-memory repository
//!
//! Same contract as the PostgreSQL repository, backed by vectors behind a
//! lock. Used by tests and by local runs without a database. Individual
//! operations can be made to fail to exercise error paths.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use tokio::sync::RwLock;

use super::BookingRepository;
use crate::{
    error::{AppError, AppResult},
    models::{
        restriction::RESTRICTION_OWNER_BLOCK, GuestDetails, NewReservation, NewRoomRestriction,
        Reservation, ReservationWithRoom, Room, RoomRestriction, User,
    },
    services::availability::{is_free, DateRange},
};

/// Operations that can be forced to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    InsertReservation,
    InsertRestriction,
    SearchAvailability,
    InsertBlock,
    DeleteBlock,
}

#[derive(Default)]
struct State {
    rooms: Vec<Room>,
    reservations: Vec<Reservation>,
    restrictions: Vec<RoomRestriction>,
    users: Vec<User>,
    next_reservation_id: i32,
    next_restriction_id: i32,
}

#[derive(Default)]
pub struct MemoryRepository {
    state: RwLock<State>,
    failing: Mutex<HashSet<FailPoint>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository seeded with rooms numbered from 1 in the given order
    pub fn with_rooms(names: &[&str]) -> Self {
        let now = Utc::now();
        let rooms = names
            .iter()
            .zip(1..)
            .map(|(name, id)| Room {
                id,
                room_name: name.to_string(),
                created_at: Some(now),
                updated_at: Some(now),
            })
            .collect();
        Self {
            state: RwLock::new(State {
                rooms,
                ..State::default()
            }),
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub async fn add_user(&self, user: User) {
        self.state.write().await.users.push(user);
    }

    /// Make `point` fail until [`MemoryRepository::heal`] is called
    pub fn fail_on(&self, point: FailPoint) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(point);
        }
    }

    pub fn heal(&self) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.clear();
        }
    }

    /// Every stored restriction, for assertions
    pub async fn restrictions(&self) -> Vec<RoomRestriction> {
        self.state.read().await.restrictions.clone()
    }

    pub async fn reservations(&self) -> Vec<Reservation> {
        self.state.read().await.reservations.clone()
    }

    fn check(&self, point: FailPoint) -> AppResult<()> {
        let failing = self
            .failing
            .lock()
            .map(|set| set.contains(&point))
            .unwrap_or(false);
        if failing {
            return Err(AppError::Database(sqlx::Error::Protocol(format!(
                "injected failure: {:?}",
                point
            ))));
        }
        Ok(())
    }
}

impl State {
    fn room(&self, id: i32) -> AppResult<&Room> {
        self.rooms
            .iter()
            .find(|room| room.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Room {} not found", id)))
    }

    fn restrictions_for(&self, room_id: i32, range: &DateRange) -> Vec<RoomRestriction> {
        let mut rows: Vec<_> = self
            .restrictions
            .iter()
            .filter(|r| r.room_id == room_id && DateRange::from(*r).overlaps(range))
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.start_date, r.id));
        rows
    }

    fn with_room(&self, reservation: &Reservation) -> ReservationWithRoom {
        let room_name = self
            .room(reservation.room_id)
            .map(|room| room.room_name.clone())
            .unwrap_or_default();
        ReservationWithRoom {
            reservation: reservation.clone(),
            room_name,
        }
    }

    fn listed(&self, only_new: bool) -> Vec<ReservationWithRoom> {
        let mut rows: Vec<_> = self
            .reservations
            .iter()
            .filter(|r| !only_new || r.processed == 0)
            .map(|r| self.with_room(r))
            .collect();
        rows.sort_by_key(|r| r.reservation.start_date);
        rows
    }

    fn reservation_mut(&mut self, id: i32) -> AppResult<&mut Reservation> {
        self.reservations
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Reservation {} not found", id)))
    }
}

#[async_trait]
impl BookingRepository for MemoryRepository {
    async fn get_room_by_id(&self, id: i32) -> AppResult<Room> {
        self.state.read().await.room(id).cloned()
    }

    async fn all_rooms(&self) -> AppResult<Vec<Room>> {
        let mut rooms = self.state.read().await.rooms.clone();
        rooms.sort_by_key(|room| room.id);
        Ok(rooms)
    }

    async fn insert_reservation(&self, data: &NewReservation) -> AppResult<i32> {
        self.check(FailPoint::InsertReservation)?;
        let mut state = self.state.write().await;
        state.room(data.room_id)?;

        state.next_reservation_id += 1;
        let id = state.next_reservation_id;
        let now = Utc::now();
        state.reservations.push(Reservation {
            id,
            first_name: data.first_name.clone(),
            last_name: data.last_name.clone(),
            email: data.email.clone(),
            phone: data.phone.clone(),
            start_date: data.start_date,
            end_date: data.end_date,
            room_id: data.room_id,
            processed: 0,
            created_at: Some(now),
            updated_at: Some(now),
        });
        Ok(id)
    }

    async fn insert_room_restriction(&self, data: &NewRoomRestriction) -> AppResult<()> {
        self.check(FailPoint::InsertRestriction)?;
        let mut state = self.state.write().await;
        state.room(data.room_id)?;

        state.next_restriction_id += 1;
        let id = state.next_restriction_id;
        let now = Utc::now();
        state.restrictions.push(RoomRestriction {
            id,
            start_date: data.start_date,
            end_date: data.end_date,
            room_id: data.room_id,
            reservation_id: data.reservation_id,
            restriction_id: data.restriction_id,
            created_at: Some(now),
            updated_at: Some(now),
        });
        Ok(())
    }

    async fn search_availability_for_all_rooms(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<Room>> {
        self.check(FailPoint::SearchAvailability)?;
        let state = self.state.read().await;
        let range = DateRange::new(start, end);
        let mut rooms: Vec<_> = state
            .rooms
            .iter()
            .filter(|room| is_free(&state.restrictions_for(room.id, &range), &range))
            .cloned()
            .collect();
        rooms.sort_by_key(|room| room.id);
        Ok(rooms)
    }

    async fn has_availability_by_dates_by_room_id(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        room_id: i32,
    ) -> AppResult<bool> {
        let state = self.state.read().await;
        let range = DateRange::new(start, end);
        Ok(is_free(&state.restrictions_for(room_id, &range), &range))
    }

    async fn get_room_restrictions_for_room_by_date(
        &self,
        room_id: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<RoomRestriction>> {
        let state = self.state.read().await;
        Ok(state.restrictions_for(room_id, &DateRange::new(start, end)))
    }

    async fn insert_block_for_room_restriction(&self, room_id: i32, date: NaiveDate) -> AppResult<()> {
        self.check(FailPoint::InsertBlock)?;
        let end = date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| AppError::Validation(format!("Date {} out of range", date)))?;
        self.insert_room_restriction(&NewRoomRestriction {
            start_date: date,
            end_date: end,
            room_id,
            reservation_id: None,
            restriction_id: RESTRICTION_OWNER_BLOCK,
        })
        .await
    }

    async fn delete_block_by_id(&self, id: i32) -> AppResult<()> {
        self.check(FailPoint::DeleteBlock)?;
        let mut state = self.state.write().await;
        let before = state.restrictions.len();
        state
            .restrictions
            .retain(|r| !(r.id == id && r.reservation_id.is_none()));
        if state.restrictions.len() == before {
            return Err(AppError::NotFound(format!("Block {} not found", id)));
        }
        Ok(())
    }

    async fn all_reservations(&self) -> AppResult<Vec<ReservationWithRoom>> {
        Ok(self.state.read().await.listed(false))
    }

    async fn all_new_reservations(&self) -> AppResult<Vec<ReservationWithRoom>> {
        Ok(self.state.read().await.listed(true))
    }

    async fn get_reservation_by_id(&self, id: i32) -> AppResult<ReservationWithRoom> {
        let state = self.state.read().await;
        state
            .reservations
            .iter()
            .find(|r| r.id == id)
            .map(|r| state.with_room(r))
            .ok_or_else(|| AppError::NotFound(format!("Reservation {} not found", id)))
    }

    async fn update_reservation(&self, id: i32, guest: &GuestDetails) -> AppResult<()> {
        let mut state = self.state.write().await;
        let reservation = state.reservation_mut(id)?;
        reservation.first_name = guest.first_name.clone();
        reservation.last_name = guest.last_name.clone();
        reservation.email = guest.email.clone();
        reservation.phone = guest.phone.clone();
        reservation.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn delete_reservation(&self, id: i32) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.reservation_mut(id)?;
        state.reservations.retain(|r| r.id != id);
        state.restrictions.retain(|r| r.reservation_id != Some(id));
        Ok(())
    }

    async fn update_processed_for_reservation(&self, id: i32, processed: i32) -> AppResult<()> {
        let mut state = self.state.write().await;
        let reservation = state.reservation_mut(id)?;
        reservation.processed = processed;
        reservation.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::restriction::RESTRICTION_RESERVATION;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn stay(room_id: i32) -> NewReservation {
        NewReservation {
            first_name: "John".to_string(),
            last_name: "Smith".to_string(),
            email: "john@smith.com".to_string(),
            phone: "555-0100".to_string(),
            start_date: d("2024-06-10"),
            end_date: d("2024-06-15"),
            room_id,
        }
    }

    #[tokio::test]
    async fn test_rooms() {
        let repo = MemoryRepository::with_rooms(&["A", "B"]);
        assert_eq!(repo.all_rooms().await.unwrap().len(), 2);
        assert_eq!(repo.get_room_by_id(2).await.unwrap().room_name, "B");
        assert!(matches!(repo.get_room_by_id(3).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_restriction_requires_valid_room() {
        let repo = MemoryRepository::with_rooms(&["A"]);
        let result = repo
            .insert_room_restriction(&NewRoomRestriction {
                start_date: d("2024-06-10"),
                end_date: d("2024-06-15"),
                room_id: 99,
                reservation_id: None,
                restriction_id: RESTRICTION_OWNER_BLOCK,
            })
            .await;
        assert!(result.is_err());
        assert!(repo.restrictions().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_reservation_drops_its_restriction() {
        let repo = MemoryRepository::with_rooms(&["A"]);
        let id = repo.insert_reservation(&stay(1)).await.unwrap();
        repo.insert_room_restriction(&NewRoomRestriction {
            start_date: d("2024-06-10"),
            end_date: d("2024-06-15"),
            room_id: 1,
            reservation_id: Some(id),
            restriction_id: RESTRICTION_RESERVATION,
        })
        .await
        .unwrap();
        repo.insert_block_for_room_restriction(1, d("2024-06-20")).await.unwrap();

        repo.delete_reservation(id).await.unwrap();

        let left = repo.restrictions().await;
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].reservation_id, None);
        assert!(matches!(repo.delete_reservation(id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_block_ignores_reservation_restrictions() {
        let repo = MemoryRepository::with_rooms(&["A"]);
        repo.insert_room_restriction(&NewRoomRestriction {
            start_date: d("2024-06-10"),
            end_date: d("2024-06-15"),
            room_id: 1,
            reservation_id: Some(4),
            restriction_id: RESTRICTION_RESERVATION,
        })
        .await
        .unwrap();
        assert!(repo.delete_block_by_id(1).await.is_err());
        assert_eq!(repo.restrictions().await.len(), 1);
    }

    #[tokio::test]
    async fn test_new_reservations_and_processing() {
        let repo = MemoryRepository::with_rooms(&["A"]);
        let first = repo.insert_reservation(&stay(1)).await.unwrap();
        let second = repo.insert_reservation(&stay(1)).await.unwrap();

        repo.update_processed_for_reservation(first, 1).await.unwrap();

        let fresh = repo.all_new_reservations().await.unwrap();
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].reservation.id, second);
        assert_eq!(fresh[0].room_name, "A");
        assert_eq!(repo.all_reservations().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fail_points() {
        let repo = MemoryRepository::with_rooms(&["A"]);
        repo.fail_on(FailPoint::InsertReservation);
        assert!(matches!(repo.insert_reservation(&stay(1)).await, Err(AppError::Database(_))));
        repo.heal();
        assert!(repo.insert_reservation(&stay(1)).await.is_ok());
    }
}
