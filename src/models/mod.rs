//! Data models for the bookings server

pub mod calendar;
pub mod dates;
pub mod mail;
pub mod reservation;
pub mod restriction;
pub mod room;
pub mod user;

// Re-export commonly used types
pub use calendar::{CalendarMonth, DayStatusMap, RoomCalendar};
pub use mail::MailData;
pub use reservation::{DraftReservation, GuestDetails, NewReservation, Reservation, ReservationWithRoom};
pub use restriction::{NewRoomRestriction, RestrictionKind, RoomRestriction};
pub use room::Room;
pub use user::User;
