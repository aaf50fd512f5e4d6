//! Business logic services

pub mod auth;
pub mod availability;
pub mod booking;
pub mod calendar;
pub mod mail;
pub mod reservations;
pub mod session;

use std::sync::Arc;

use crate::{config::EmailConfig, repository::BookingRepository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub availability: availability::AvailabilityService,
    pub booking: booking::BookingService,
    pub calendar: calendar::CalendarService,
    pub reservations: reservations::ReservationsService,
    pub auth: auth::AuthService,
    pub sessions: session::SessionStore,
    pub mailer: mail::Mailer,
}

impl Services {
    /// Wire every service onto the repository variant picked by the caller
    pub fn new(
        repository: Arc<dyn BookingRepository>,
        sessions: session::SessionStore,
        mailer: mail::Mailer,
        email_config: EmailConfig,
    ) -> Self {
        let availability = availability::AvailabilityService::new(repository.clone());
        Self {
            booking: booking::BookingService::new(
                repository.clone(),
                availability.clone(),
                mailer.clone(),
                email_config,
            ),
            calendar: calendar::CalendarService::new(repository.clone()),
            reservations: reservations::ReservationsService::new(repository.clone()),
            auth: auth::AuthService::new(repository, sessions.clone()),
            availability,
            sessions,
            mailer,
        }
    }
}
