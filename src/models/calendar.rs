//! Admin calendar views

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::room::Room;

/// Per-day status of one room over one month: 0 = free, otherwise the id of
/// the reservation (reservation view) or restriction (block view) occupying
/// the day.
pub type DayStatusMap = BTreeMap<NaiveDate, i32>;

/// Both views of a room for the displayed month
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomCalendar {
    pub room: Room,
    pub reservations: DayStatusMap,
    pub blocks: DayStatusMap,
}

/// A month of the admin calendar, every room included
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    pub rooms: Vec<RoomCalendar>,
}

impl CalendarMonth {
    pub fn days_in_month(&self) -> usize {
        (self.last_day - self.first_day).num_days() as usize + 1
    }
}
