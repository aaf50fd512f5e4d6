//! Staff management of persisted reservations

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    error::AppResult,
    forms::Form,
    models::{GuestDetails, ReservationWithRoom},
    repository::BookingRepository,
};

#[derive(Debug)]
pub enum UpdateOutcome {
    Updated,
    Invalid(Form),
}

#[derive(Clone)]
pub struct ReservationsService {
    repository: Arc<dyn BookingRepository>,
}

impl ReservationsService {
    pub fn new(repository: Arc<dyn BookingRepository>) -> Self {
        Self { repository }
    }

    pub async fn all(&self) -> AppResult<Vec<ReservationWithRoom>> {
        self.repository.all_reservations().await
    }

    /// Reservations staff have not processed yet
    pub async fn unprocessed(&self) -> AppResult<Vec<ReservationWithRoom>> {
        self.repository.all_new_reservations().await
    }

    pub async fn get(&self, id: i32) -> AppResult<ReservationWithRoom> {
        self.repository.get_reservation_by_id(id).await
    }

    /// Overwrite the guest fields from a posted edit form
    pub async fn update(&self, id: i32, values: HashMap<String, String>) -> AppResult<UpdateOutcome> {
        // 404 before validating
        self.repository.get_reservation_by_id(id).await?;

        let mut form = Form::trimmed(values);
        form.required(&["first_name", "last_name", "email"]);
        form.is_email("email");
        if !form.valid() {
            return Ok(UpdateOutcome::Invalid(form));
        }

        let guest = GuestDetails {
            first_name: form.get("first_name").to_string(),
            last_name: form.get("last_name").to_string(),
            email: form.get("email").to_string(),
            phone: form.get("phone").to_string(),
        };
        self.repository.update_reservation(id, &guest).await?;
        tracing::info!(reservation_id = id, "Reservation updated");
        Ok(UpdateOutcome::Updated)
    }

    pub async fn mark_processed(&self, id: i32) -> AppResult<()> {
        self.repository.update_processed_for_reservation(id, 1).await?;
        tracing::info!(reservation_id = id, "Reservation marked as processed");
        Ok(())
    }

    /// Delete a reservation, freeing its room-days
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.delete_reservation(id).await?;
        tracing::info!(reservation_id = id, "Reservation deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::AppError,
        models::{restriction::RESTRICTION_RESERVATION, NewReservation, NewRoomRestriction},
        repository::MemoryRepository,
    };
    use chrono::NaiveDate;

    async fn fixture() -> (ReservationsService, Arc<MemoryRepository>, i32) {
        let repo = Arc::new(MemoryRepository::with_rooms(&["General's Quarters"]));
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let id = repo
            .insert_reservation(&NewReservation {
                first_name: "John".to_string(),
                last_name: "Smith".to_string(),
                email: "john@smith.com".to_string(),
                phone: String::new(),
                start_date: start,
                end_date: end,
                room_id: 1,
            })
            .await
            .unwrap();
        repo.insert_room_restriction(&NewRoomRestriction {
            start_date: start,
            end_date: end,
            room_id: 1,
            reservation_id: Some(id),
            restriction_id: RESTRICTION_RESERVATION,
        })
        .await
        .unwrap();
        (ReservationsService::new(repo.clone()), repo, id)
    }

    #[tokio::test]
    async fn test_process_moves_out_of_new() {
        let (service, _, id) = fixture().await;
        assert_eq!(service.unprocessed().await.unwrap().len(), 1);
        service.mark_processed(id).await.unwrap();
        assert!(service.unprocessed().await.unwrap().is_empty());
        assert_eq!(service.all().await.unwrap().len(), 1);
        assert_eq!(service.get(id).await.unwrap().reservation.processed, 1);
    }

    #[tokio::test]
    async fn test_update_guest_fields() {
        let (service, _, id) = fixture().await;
        let values = HashMap::from([
            ("first_name".to_string(), "Jane".to_string()),
            ("last_name".to_string(), "Doe".to_string()),
            ("email".to_string(), "jane@doe.com".to_string()),
        ]);
        assert!(matches!(service.update(id, values).await.unwrap(), UpdateOutcome::Updated));
        let reservation = service.get(id).await.unwrap();
        assert_eq!(reservation.reservation.first_name, "Jane");
        assert_eq!(reservation.room_name, "General's Quarters");

        let outcome = service.update(id, HashMap::new()).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Invalid(_)));
        assert!(matches!(service.update(99, HashMap::new()).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_frees_room() {
        let (service, repo, id) = fixture().await;
        service.delete(id).await.unwrap();
        assert!(repo.restrictions().await.is_empty());
        assert!(matches!(service.get(id).await, Err(AppError::NotFound(_))));
    }
}
