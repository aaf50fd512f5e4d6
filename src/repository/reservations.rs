//! Reservations domain methods on Repository

use chrono::Utc;

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::{GuestDetails, NewReservation, ReservationWithRoom},
};

const SELECT_WITH_ROOM: &str = r#"
    SELECT r.id, r.first_name, r.last_name, r.email, r.phone, r.start_date, r.end_date,
           r.room_id, r.processed, r.created_at, r.updated_at, rm.room_name
    FROM reservations r
    JOIN rooms rm ON rm.id = r.room_id
"#;

impl Repository {
    /// Insert a reservation, returning its id
    pub async fn reservations_insert(&self, data: &NewReservation) -> AppResult<i32> {
        let now = Utc::now();
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO reservations
                (first_name, last_name, email, phone, start_date, end_date, room_id,
                 processed, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $8)
            RETURNING id
            "#,
        )
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.room_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// List reservations with their room name, oldest stay first
    pub async fn reservations_list(&self, only_new: bool) -> AppResult<Vec<ReservationWithRoom>> {
        let query = if only_new {
            format!("{} WHERE r.processed = 0 ORDER BY r.start_date ASC", SELECT_WITH_ROOM)
        } else {
            format!("{} ORDER BY r.start_date ASC", SELECT_WITH_ROOM)
        };

        let rows = sqlx::query_as::<_, ReservationWithRoom>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Get a reservation by ID
    pub async fn reservations_get_by_id(&self, id: i32) -> AppResult<ReservationWithRoom> {
        let query = format!("{} WHERE r.id = $1", SELECT_WITH_ROOM);
        sqlx::query_as::<_, ReservationWithRoom>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation {} not found", id)))
    }

    /// Update guest fields
    pub async fn reservations_update(&self, id: i32, guest: &GuestDetails) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET first_name = $1, last_name = $2, email = $3, phone = $4, updated_at = $5
            WHERE id = $6
            "#,
        )
        .bind(&guest.first_name)
        .bind(&guest.last_name)
        .bind(&guest.email)
        .bind(&guest.phone)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Reservation {} not found", id)));
        }
        Ok(())
    }

    /// Delete a reservation (its restriction goes with it, ON DELETE CASCADE)
    pub async fn reservations_delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Reservation {} not found", id)));
        }
        Ok(())
    }

    /// Set the processed flag
    pub async fn reservations_set_processed(&self, id: i32, processed: i32) -> AppResult<()> {
        let result = sqlx::query("UPDATE reservations SET processed = $1, updated_at = $2 WHERE id = $3")
            .bind(processed)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Reservation {} not found", id)));
        }
        Ok(())
    }
}
