//! Admin calendar: per-day occupancy maps and block reconciliation
//!
//! For each room the month is rendered twice: the reservation view marks
//! every day of a guest stay with the reservation id, the block view marks
//! the start day of each manual block with the restriction id. The block
//! view is cached in session so the next calendar POST can be diffed
//! against it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Days, NaiveDate};

use crate::{
    error::AppResult,
    models::{
        dates::{month_bounds, parse_date},
        restriction::RestrictionKind,
        CalendarMonth, DayStatusMap, Room, RoomCalendar, RoomRestriction,
    },
    repository::BookingRepository,
    services::{
        availability::DateRange,
        session::{Session, SessionKey},
    },
};

const REMOVE_BLOCK_PREFIX: &str = "remove_block_";
const ADD_BLOCK_PREFIX: &str = "add_block_";

/// Writes issued by one reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub deleted: usize,
    pub inserted: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct CalendarService {
    repository: Arc<dyn BookingRepository>,
}

impl CalendarService {
    pub fn new(repository: Arc<dyn BookingRepository>) -> Self {
        Self { repository }
    }

    /// Day-status maps of every room for one month
    pub async fn month(&self, year: i32, month: u32) -> AppResult<CalendarMonth> {
        let (first_day, last_day) = month_bounds(year, month)?;
        let rooms = self.repository.all_rooms().await?;

        let mut calendars = Vec::with_capacity(rooms.len());
        for room in rooms {
            calendars.push(self.room_calendar(room, first_day, last_day).await?);
        }

        Ok(CalendarMonth {
            year,
            month,
            first_day,
            last_day,
            rooms: calendars,
        })
    }

    /// Build the month and cache each room's block view in session
    pub async fn show(&self, session: &Session, year: i32, month: u32) -> AppResult<CalendarMonth> {
        let calendar = self.month(year, month).await?;
        for room in &calendar.rooms {
            session
                .put(SessionKey::BlockMap(room.room.id), &room.blocks)
                .await?;
        }
        Ok(calendar)
    }

    async fn room_calendar(&self, room: Room, first_day: NaiveDate, last_day: NaiveDate) -> AppResult<RoomCalendar> {
        let restrictions = self
            .repository
            .get_room_restrictions_for_room_by_date(room.id, first_day, last_day + Days::new(1))
            .await?;
        let (reservations, blocks) = day_maps(&restrictions, first_day, last_day);
        Ok(RoomCalendar {
            room,
            reservations,
            blocks,
        })
    }

    /// Apply a posted calendar form against the cached block views.
    ///
    /// A cached block whose day carries neither `remove_block_<room>_<day>`
    /// nor `add_block_<room>_<day>` is deleted. Every `add_block` key inserts
    /// a block unless one is already cached for that day. Failing items are
    /// logged and counted; the rest still go through. The cache is rebuilt
    /// for `(year, month)` afterwards.
    pub async fn reconcile(
        &self,
        session: &Session,
        year: i32,
        month: u32,
        posted: &HashMap<String, String>,
    ) -> AppResult<ReconcileReport> {
        // reject the month before touching any block
        month_bounds(year, month)?;
        let kept = block_keys(posted, REMOVE_BLOCK_PREFIX);
        let added = block_keys(posted, ADD_BLOCK_PREFIX);

        let mut report = ReconcileReport::default();
        let mut cached: HashSet<(i32, NaiveDate)> = HashSet::new();

        for room in self.repository.all_rooms().await? {
            let blocks: DayStatusMap = match session.get(SessionKey::BlockMap(room.id)).await? {
                Some(blocks) => blocks,
                None => {
                    tracing::warn!(room_id = room.id, "No cached block map, nothing to remove");
                    DayStatusMap::new()
                }
            };

            for (day, restriction_id) in blocks {
                if restriction_id == 0 {
                    continue;
                }
                let key = (room.id, day);
                if kept.contains(&key) || added.contains(&key) {
                    cached.insert(key);
                    continue;
                }
                match self.repository.delete_block_by_id(restriction_id).await {
                    Ok(()) => report.deleted += 1,
                    Err(e) => {
                        tracing::warn!(room_id = room.id, restriction_id, "Failed to remove block: {}", e);
                        report.failed += 1;
                    }
                }
            }
        }

        for (room_id, day) in added {
            if cached.contains(&(room_id, day)) {
                continue;
            }
            match self.repository.insert_block_for_room_restriction(room_id, day).await {
                Ok(()) => report.inserted += 1,
                Err(e) => {
                    tracing::warn!(room_id, %day, "Failed to add block: {}", e);
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            deleted = report.deleted,
            inserted = report.inserted,
            failed = report.failed,
            "Calendar reconciled"
        );

        self.show(session, year, month).await?;
        Ok(report)
    }
}

/// Reservation view and block view of one room over `[first_day, last_day]`
pub fn day_maps(
    restrictions: &[RoomRestriction],
    first_day: NaiveDate,
    last_day: NaiveDate,
) -> (DayStatusMap, DayStatusMap) {
    let month = DateRange::new(first_day, last_day + Days::new(1));
    let mut reservations = DayStatusMap::new();
    let mut blocks = DayStatusMap::new();
    for day in month.days() {
        reservations.insert(day, 0);
        blocks.insert(day, 0);
    }

    for restriction in restrictions {
        match restriction.kind() {
            RestrictionKind::Reservation(reservation_id) => {
                let stay = DateRange::new(
                    restriction.start_date.max(month.start),
                    restriction.end_date.min(month.end),
                );
                for day in stay.days() {
                    reservations.insert(day, reservation_id);
                }
            }
            RestrictionKind::Block => {
                if let Some(status) = blocks.get_mut(&restriction.start_date) {
                    *status = restriction.id;
                }
            }
        }
    }

    (reservations, blocks)
}

/// `(room, day)` pairs encoded in posted keys starting with `prefix`.
/// Malformed keys are skipped.
fn block_keys(posted: &HashMap<String, String>, prefix: &str) -> HashSet<(i32, NaiveDate)> {
    posted
        .keys()
        .filter_map(|key| {
            let rest = key.strip_prefix(prefix)?;
            let parsed = parse_block_key(rest);
            if parsed.is_none() {
                tracing::warn!(key = %key, "Ignoring malformed calendar field");
            }
            parsed
        })
        .collect()
}

fn parse_block_key(rest: &str) -> Option<(i32, NaiveDate)> {
    let (room_id, day) = rest.split_once('_')?;
    Some((room_id.parse().ok()?, parse_date(day).ok()?))
}

/// Name of the posted field keeping `(room, day)`'s block
pub fn remove_block_field(room_id: i32, day: NaiveDate) -> String {
    format!("{}{}_{}", REMOVE_BLOCK_PREFIX, room_id, day.format("%Y-%m-%d"))
}

/// Name of the posted field adding a block on `(room, day)`
pub fn add_block_field(room_id: i32, day: NaiveDate) -> String {
    format!("{}{}_{}", ADD_BLOCK_PREFIX, room_id, day.format("%Y-%m-%d"))
}
