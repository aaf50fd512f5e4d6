//! Guest booking workflow
//!
//! `Searching -> RoomChosen -> DraftEntered -> Confirmed`, driven by the
//! guest's requests. The draft lives in the guest's session under
//! [`SessionKey::Reservation`] and is persisted only on confirmation.
//!
//! Confirmation issues two independent inserts (reservation row, then its
//! restriction). They are not wrapped in a transaction: if the restriction
//! insert fails the reservation row stays behind without a restriction.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
    forms::Form,
    models::{
        dates::format_date, restriction::RESTRICTION_RESERVATION, DraftReservation, GuestDetails,
        MailData, NewRoomRestriction, Room,
    },
    repository::BookingRepository,
    services::{
        availability::{AvailabilityService, DateRange},
        mail::Mailer,
        session::{Session, SessionKey},
    },
};

pub const MAIL_TEMPLATE: &str = "basic.html";

/// Where a guest stands in the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStep {
    Searching,
    RoomChosen,
    DraftEntered,
    Confirmed,
}

impl BookingStep {
    /// Step implied by the draft held in session
    pub fn of(draft: Option<&DraftReservation>) -> Self {
        match draft {
            None => BookingStep::Searching,
            Some(d) if d.is_confirmed() => BookingStep::Confirmed,
            Some(d) if d.room_id.is_some() => BookingStep::DraftEntered,
            Some(_) => BookingStep::RoomChosen,
        }
    }
}

#[derive(Debug)]
pub enum SearchOutcome {
    /// Candidate rooms; the draft now holds the dates
    Available(Vec<Room>),
    NoAvailability,
}

#[derive(Debug)]
pub enum ConfirmOutcome {
    Confirmed(DraftReservation),
    /// Field errors; nothing was written
    Invalid { form: Form, draft: DraftReservation },
    /// The room was taken since it was chosen
    Unavailable,
}

#[derive(Clone)]
pub struct BookingService {
    repository: Arc<dyn BookingRepository>,
    availability: AvailabilityService,
    mailer: Mailer,
    email: EmailConfig,
}

impl BookingService {
    pub fn new(
        repository: Arc<dyn BookingRepository>,
        availability: AvailabilityService,
        mailer: Mailer,
        email: EmailConfig,
    ) -> Self {
        Self {
            repository,
            availability,
            mailer,
            email,
        }
    }

    /// Searching -> RoomChosen: list free rooms and start a draft
    pub async fn search(&self, session: &Session, start: NaiveDate, end: NaiveDate) -> AppResult<SearchOutcome> {
        let stay = DateRange::stay(start, end)?;
        let rooms = self.availability.free_rooms(stay.start, stay.end).await?;
        if rooms.is_empty() {
            tracing::info!(%start, %end, "No availability");
            return Ok(SearchOutcome::NoAvailability);
        }

        session
            .put(SessionKey::Reservation, &DraftReservation::new(start, end))
            .await?;
        Ok(SearchOutcome::Available(rooms))
    }

    /// RoomChosen -> DraftEntered from the room list
    pub async fn choose_room(&self, session: &Session, room_id: i32) -> AppResult<DraftReservation> {
        let mut draft: DraftReservation = session
            .get(SessionKey::Reservation)
            .await?
            .ok_or_else(|| AppError::SessionState("Can't get reservation from session".to_string()))?;

        let room = self.repository.get_room_by_id(room_id).await?;
        draft.room_id = Some(room.id);
        draft.room_name = Some(room.room_name);

        session.put(SessionKey::Reservation, &draft).await?;
        Ok(draft)
    }

    /// Straight to DraftEntered from a direct booking link
    pub async fn book_room(
        &self,
        session: &Session,
        room_id: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<DraftReservation> {
        DateRange::stay(start, end)?;
        let room = self.repository.get_room_by_id(room_id).await?;

        let mut draft = DraftReservation::new(start, end);
        draft.room_id = Some(room.id);
        draft.room_name = Some(room.room_name);

        session.put(SessionKey::Reservation, &draft).await?;
        Ok(draft)
    }

    /// The draft awaiting guest details
    pub async fn current_draft(&self, session: &Session) -> AppResult<DraftReservation> {
        let draft: Option<DraftReservation> = session.get(SessionKey::Reservation).await?;
        match BookingStep::of(draft.as_ref()) {
            BookingStep::DraftEntered => draft
                .ok_or_else(|| AppError::SessionState("Can't get reservation from session".to_string())),
            _ => Err(AppError::SessionState(
                "Can't get reservation from session".to_string(),
            )),
        }
    }

    /// DraftEntered -> Confirmed: validate guest details and commit
    pub async fn confirm(&self, session: &Session, values: HashMap<String, String>) -> AppResult<ConfirmOutcome> {
        let mut draft = self.current_draft(session).await?;
        let room_id = draft
            .room_id
            .ok_or_else(|| AppError::SessionState("No room chosen".to_string()))?;

        let mut form = Form::trimmed(values);
        draft.guest = GuestDetails {
            first_name: form.get("first_name").to_string(),
            last_name: form.get("last_name").to_string(),
            email: form.get("email").to_string(),
            phone: form.get("phone").to_string(),
        };

        form.required(&["first_name", "last_name", "email"]);
        form.min_length("first_name", 3);
        form.is_email("email");
        if !form.valid() {
            return Ok(ConfirmOutcome::Invalid { form, draft });
        }

        if !self
            .availability
            .room_is_free(draft.start_date, draft.end_date, room_id)
            .await?
        {
            tracing::info!(room_id, start = %draft.start_date, end = %draft.end_date, "Room taken before confirmation");
            return Ok(ConfirmOutcome::Unavailable);
        }

        let reservation_id = self
            .repository
            .insert_reservation(&draft.to_new_reservation(room_id))
            .await?;

        let restriction = NewRoomRestriction {
            start_date: draft.start_date,
            end_date: draft.end_date,
            room_id,
            reservation_id: Some(reservation_id),
            restriction_id: RESTRICTION_RESERVATION,
        };
        if let Err(e) = self.repository.insert_room_restriction(&restriction).await {
            tracing::error!(reservation_id, "Reservation stored without its room restriction: {}", e);
            return Err(e);
        }

        draft.reservation_id = Some(reservation_id);
        session.put(SessionKey::Reservation, &draft).await?;
        tracing::info!(reservation_id, room_id, "Reservation confirmed");

        self.notify(&draft);
        Ok(ConfirmOutcome::Confirmed(draft))
    }

    /// Confirmed draft, read once then cleared from the session
    pub async fn summary(&self, session: &Session) -> AppResult<DraftReservation> {
        let draft: Option<DraftReservation> = session.get(SessionKey::Reservation).await?;
        match draft {
            Some(draft) if draft.is_confirmed() => {
                session.remove(SessionKey::Reservation).await?;
                Ok(draft)
            }
            _ => Err(AppError::SessionState(
                "Can't get reservation from session".to_string(),
            )),
        }
    }

    /// Guest confirmation and staff notification; fire-and-forget
    fn notify(&self, draft: &DraftReservation) {
        for msg in confirmation_mails(draft, &self.email.smtp_from, &self.email.staff_address) {
            if let Err(e) = self.mailer.send(msg) {
                tracing::error!("Mail queue unavailable: {}", e);
            }
        }
    }
}

/// Messages sent for a confirmed reservation: guest first, then staff
pub fn confirmation_mails(draft: &DraftReservation, from: &str, staff: &str) -> [MailData; 2] {
    let start = format_date(draft.start_date);
    let end = format_date(draft.end_date);
    let room = draft.room_name.as_deref().unwrap_or("your room");

    let guest = MailData {
        to: draft.guest.email.clone(),
        from: from.to_string(),
        subject: "Reservation Confirmation".to_string(),
        content: format!(
            "<strong>Reservation Confirmation</strong><br>\
             Dear {}, <br>\
             This is to confirm your reservation from {} to {}, for {}.",
            draft.guest.first_name, start, end, room
        ),
        template: Some(MAIL_TEMPLATE.to_string()),
    };

    let staff = MailData {
        to: staff.to_string(),
        from: from.to_string(),
        subject: "Reservation Notification".to_string(),
        content: format!(
            "<strong>Reservation Notification</strong><br>\
             A reservation has been made for {} from {} to {}.",
            room, start, end
        ),
        template: Some(MAIL_TEMPLATE.to_string()),
    };

    [guest, staff]
}
