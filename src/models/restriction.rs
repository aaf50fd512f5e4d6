//! Room restrictions: the unit of room-day consumption

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// `restrictions.id` of the "Reservation" restriction type
pub const RESTRICTION_RESERVATION: i32 = 1;
/// `restrictions.id` of the "Owner Block" restriction type
pub const RESTRICTION_OWNER_BLOCK: i32 = 2;

/// A date range `[start_date, end_date)` during which a room is unavailable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RoomRestriction {
    pub id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub room_id: i32,
    /// Present for reservation restrictions, absent for manual blocks
    pub reservation_id: Option<i32>,
    pub restriction_id: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// What consumes the room-days of a restriction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestrictionKind {
    Reservation(i32),
    Block,
}

impl RoomRestriction {
    pub fn kind(&self) -> RestrictionKind {
        match self.reservation_id {
            Some(id) if id > 0 => RestrictionKind::Reservation(id),
            _ => RestrictionKind::Block,
        }
    }
}

/// Insert payload for a room restriction
#[derive(Debug, Clone)]
pub struct NewRoomRestriction {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub room_id: i32,
    pub reservation_id: Option<i32>,
    pub restriction_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restriction(reservation_id: Option<i32>) -> RoomRestriction {
        RoomRestriction {
            id: 7,
            start_date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 7, 2).unwrap(),
            room_id: 1,
            reservation_id,
            restriction_id: RESTRICTION_OWNER_BLOCK,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_kind() {
        assert_eq!(restriction(Some(3)).kind(), RestrictionKind::Reservation(3));
        assert_eq!(restriction(None).kind(), RestrictionKind::Block);
        // zero is the legacy "no reservation" marker
        assert_eq!(restriction(Some(0)).kind(), RestrictionKind::Block);
    }
}
