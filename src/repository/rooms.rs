//! Rooms domain methods on Repository

use chrono::NaiveDate;

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::Room,
};

impl Repository {
    /// Get a room by ID
    pub async fn rooms_get_by_id(&self, id: i32) -> AppResult<Room> {
        sqlx::query_as::<_, Room>(
            "SELECT id, room_name, created_at, updated_at FROM rooms WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Room {} not found", id)))
    }

    /// List all rooms, ordered by id
    pub async fn rooms_list(&self) -> AppResult<Vec<Room>> {
        let rows = sqlx::query_as::<_, Room>(
            "SELECT id, room_name, created_at, updated_at FROM rooms ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Rooms without any restriction overlapping [start, end)
    pub async fn rooms_available(&self, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<Room>> {
        let rows = sqlx::query_as::<_, Room>(
            r#"
            SELECT r.id, r.room_name, r.created_at, r.updated_at
            FROM rooms r
            WHERE r.id NOT IN (
                SELECT rr.room_id
                FROM room_restrictions rr
                WHERE $1 < $2 AND rr.start_date < $2 AND rr.end_date > $1
            )
            ORDER BY r.id
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
