//! Availability engine
//!
//! Answers "is this room free over `[start, end)`?" and "which rooms are
//! free?". Ranges are half-open: a stay ending on day D does not conflict
//! with one starting on day D. Every call re-reads persisted state; nothing
//! is cached or locked here.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::{
    error::{AppError, AppResult},
    models::{Room, RoomRestriction},
    repository::BookingRepository,
};

/// Half-open date range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Build a stay range, rejecting zero-length and inverted ranges
    pub fn stay(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        if start >= end {
            return Err(AppError::Validation(
                "End date must be after start date".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    /// A range spanning no day at all
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        overlaps(self, other)
    }

    /// Days covered by the range, in order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day < end)
    }
}

impl From<&RoomRestriction> for DateRange {
    fn from(r: &RoomRestriction) -> Self {
        DateRange::new(r.start_date, r.end_date)
    }
}

/// Two ranges conflict iff `a.start < b.end && b.start < a.end`.
/// Empty ranges span no day and conflict with nothing.
pub fn overlaps(a: &DateRange, b: &DateRange) -> bool {
    !a.is_empty() && !b.is_empty() && a.start < b.end && b.start < a.end
}

/// Whether none of `restrictions` overlaps `range`
pub fn is_free(restrictions: &[RoomRestriction], range: &DateRange) -> bool {
    restrictions
        .iter()
        .all(|r| !overlaps(&DateRange::from(r), range))
}

/// Engine over the repository port
#[derive(Clone)]
pub struct AvailabilityService {
    repository: Arc<dyn BookingRepository>,
}

impl AvailabilityService {
    pub fn new(repository: Arc<dyn BookingRepository>) -> Self {
        Self { repository }
    }

    /// Whether `room_id` is free over `[start, end)`.
    ///
    /// `start == end` spans no day and is trivially free; callers reject
    /// zero-length stays before asking.
    pub async fn room_is_free(&self, start: NaiveDate, end: NaiveDate, room_id: i32) -> AppResult<bool> {
        if start > end {
            return Err(AppError::Validation(
                "Start date is after end date".to_string(),
            ));
        }
        if start == end {
            return Ok(true);
        }
        self.repository
            .has_availability_by_dates_by_room_id(start, end, room_id)
            .await
    }

    /// Number of rooms on offer
    pub async fn room_count(&self) -> AppResult<usize> {
        Ok(self.repository.all_rooms().await?.len())
    }

    /// Rooms free over `[start, end)`, ascending by id. Empty when every
    /// room conflicts.
    pub async fn free_rooms(&self, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<Room>> {
        if start > end {
            return Err(AppError::Validation(
                "Start date is after end date".to_string(),
            ));
        }
        let mut rooms = if start == end {
            self.repository.all_rooms().await?
        } else {
            self.repository
                .search_availability_for_all_rooms(start, end)
                .await?
        };
        rooms.sort_by_key(|room| room.id);
        tracing::debug!(%start, %end, free = rooms.len(), "availability searched");
        Ok(rooms)
    }
}
