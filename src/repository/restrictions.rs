//! Room restriction methods on Repository (reservation restrictions and blocks)

use chrono::{Days, NaiveDate, Utc};

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::{
        restriction::RESTRICTION_OWNER_BLOCK, NewRoomRestriction, RoomRestriction,
    },
};

impl Repository {
    /// Insert a room restriction
    pub async fn restrictions_insert(&self, data: &NewRoomRestriction) -> AppResult<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO room_restrictions
                (start_date, end_date, room_id, reservation_id, restriction_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            "#,
        )
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.room_id)
        .bind(data.reservation_id)
        .bind(data.restriction_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Count restrictions of a room overlapping [start, end)
    pub async fn restrictions_count_overlapping(
        &self,
        room_id: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(id)
            FROM room_restrictions
            WHERE room_id = $1 AND $2 < $3 AND start_date < $3 AND end_date > $2
            "#,
        )
        .bind(room_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Restrictions of a room overlapping [start, end)
    pub async fn restrictions_for_room(
        &self,
        room_id: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<RoomRestriction>> {
        let rows = sqlx::query_as::<_, RoomRestriction>(
            r#"
            SELECT id, start_date, end_date, room_id, reservation_id, restriction_id,
                   created_at, updated_at
            FROM room_restrictions
            WHERE room_id = $1 AND start_date < $3 AND end_date > $2
            ORDER BY start_date, id
            "#,
        )
        .bind(room_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Insert a one-day owner block
    pub async fn restrictions_insert_block(&self, room_id: i32, date: NaiveDate) -> AppResult<()> {
        let end = date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| AppError::Validation(format!("Date {} out of range", date)))?;

        self.restrictions_insert(&NewRoomRestriction {
            start_date: date,
            end_date: end,
            room_id,
            reservation_id: None,
            restriction_id: RESTRICTION_OWNER_BLOCK,
        })
        .await
    }

    /// Delete a manual block
    pub async fn restrictions_delete_block(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query(
            "DELETE FROM room_restrictions WHERE id = $1 AND reservation_id IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Block {} not found", id)));
        }
        Ok(())
    }
}
