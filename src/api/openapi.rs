//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{admin, auth, booking, health, page};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bookings API",
        version = "1.0.0",
        description = "Room availability, guest booking and reservation administration",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    paths(
        // Health
        health::health_check,
        // Booking
        booking::search_availability,
        booking::post_search_availability,
        booking::availability_json,
        booking::choose_room,
        booking::book_room,
        booking::make_reservation,
        booking::post_make_reservation,
        booking::reservation_summary,
        // Auth
        auth::login_page,
        auth::login,
        auth::logout,
        // Admin
        admin::dashboard,
        admin::new_reservations,
        admin::all_reservations,
        admin::reservations_calendar,
        admin::post_reservations_calendar,
        admin::show_reservation,
        admin::post_show_reservation,
        admin::process_reservation,
        admin::delete_reservation,
    ),
    components(
        schemas(
            page::TemplateData,
            booking::AvailabilityJsonRequest,
            booking::AvailabilityJsonResponse,
            crate::models::Room,
            crate::models::Reservation,
            crate::models::ReservationWithRoom,
            crate::models::RoomRestriction,
            health::HealthResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "booking", description = "Guest search and booking"),
        (name = "auth", description = "Staff login"),
        (name = "admin", description = "Reservation administration and calendar")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
