//! Reservation models: persisted rows, insert payloads and the session draft

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// A guest stay as stored in the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    /// Check-in day (occupied)
    pub start_date: NaiveDate,
    /// Check-out day (not occupied)
    pub end_date: NaiveDate,
    pub room_id: i32,
    /// 0 = new, 1 = processed by staff
    pub processed: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Reservation joined with the name of its room
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ReservationWithRoom {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub reservation: Reservation,
    pub room_name: String,
}

/// Insert payload for a new reservation
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub room_id: i32,
}

/// Guest-entered fields, as posted by the reservation and admin edit forms
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

/// In-progress reservation held in the guest's session between search and
/// confirmation. Never persisted as such.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftReservation {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub room_id: Option<i32>,
    pub room_name: Option<String>,
    #[serde(default)]
    pub guest: GuestDetails,
    /// Set once the reservation has been committed
    pub reservation_id: Option<i32>,
}

impl DraftReservation {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            room_id: None,
            room_name: None,
            guest: GuestDetails::default(),
            reservation_id: None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.reservation_id.is_some()
    }

    pub fn to_new_reservation(&self, room_id: i32) -> NewReservation {
        NewReservation {
            first_name: self.guest.first_name.clone(),
            last_name: self.guest.last_name.clone(),
            email: self.guest.email.clone(),
            phone: self.guest.phone.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            room_id,
        }
    }
}
