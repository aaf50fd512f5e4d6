//! Guest booking pages

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::{AppError, AppResult},
    models::dates::{format_date, parse_date},
    services::{
        booking::{ConfirmOutcome, SearchOutcome},
        session::SessionKey,
    },
    AppState,
};

use super::{
    page::{recover, redirect_with, render, Page, TemplateData},
    CurrentSession,
};

const SEARCH_PAGE: &str = "/search-availability";

/// Room availability check request (form encoded)
#[derive(Deserialize, ToSchema)]
pub struct AvailabilityJsonRequest {
    /// Arrival, `YYYY-MM-DD`
    pub start: String,
    /// Departure, `YYYY-MM-DD`
    pub end: String,
    pub room_id: String,
}

#[derive(Serialize, ToSchema)]
pub struct AvailabilityJsonResponse {
    pub ok: bool,
    pub message: String,
    pub room_id: String,
    pub start_date: String,
    pub end_date: String,
}

/// Direct booking link parameters
#[derive(Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(default)]
pub struct BookRoomQuery {
    /// Room ID
    pub id: String,
    /// Arrival, `YYYY-MM-DD`
    pub s: String,
    /// Departure, `YYYY-MM-DD`
    pub e: String,
}

/// Search form
#[utoipa::path(
    get,
    path = "/search-availability",
    tag = "booking",
    responses((status = 200, description = "Search page", body = TemplateData))
)]
pub async fn search_availability(CurrentSession(session): CurrentSession) -> AppResult<Page> {
    render(&session, TemplateData::new("search-availability.page.tmpl")).await
}

/// Search free rooms and start a draft reservation
#[utoipa::path(
    post,
    path = "/search-availability",
    tag = "booking",
    responses(
        (status = 200, description = "Free rooms to choose from", body = TemplateData),
        (status = 303, description = "No availability or invalid dates")
    )
)]
pub async fn post_search_availability(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Form(form): Form<HashMap<String, String>>,
) -> AppResult<Page> {
    let dates = parse_stay(&form, "start", "end");
    let (start, end) = match dates {
        Ok(dates) => dates,
        Err(e) => return recover(&session, e, SEARCH_PAGE).await,
    };

    match state.services.booking.search(&session, start, end).await {
        Ok(SearchOutcome::Available(rooms)) => {
            let page = TemplateData::new("choose-room.page.tmpl").data("rooms", &rooms)?;
            render(&session, page).await
        }
        Ok(SearchOutcome::NoAvailability) => {
            redirect_with(&session, SessionKey::Error, "No availability", SEARCH_PAGE).await
        }
        Err(e) => recover(&session, e, SEARCH_PAGE).await,
    }
}

/// Check one room for a date range
#[utoipa::path(
    post,
    path = "/search-availability-json",
    tag = "booking",
    request_body(content = AvailabilityJsonRequest, content_type = "application/x-www-form-urlencoded"),
    responses((status = 200, description = "Availability of the room", body = AvailabilityJsonResponse))
)]
pub async fn availability_json(
    State(state): State<AppState>,
    Form(request): Form<AvailabilityJsonRequest>,
) -> Json<AvailabilityJsonResponse> {
    let mut response = AvailabilityJsonResponse {
        ok: false,
        message: String::new(),
        room_id: request.room_id.clone(),
        start_date: request.start.clone(),
        end_date: request.end.clone(),
    };

    let (start, end) = match (parse_date(&request.start), parse_date(&request.end)) {
        (Ok(start), Ok(end)) => (start, end),
        _ => {
            response.message = "Invalid dates".to_string();
            return Json(response);
        }
    };
    let Ok(room_id) = request.room_id.trim().parse::<i32>() else {
        response.message = "Invalid room".to_string();
        return Json(response);
    };

    match state.services.availability.room_is_free(start, end, room_id).await {
        Ok(free) => response.ok = free,
        Err(AppError::Validation(_)) => response.message = "Invalid dates".to_string(),
        Err(e) => {
            tracing::error!("Availability check failed: {}", e);
            response.message = "Error querying database".to_string();
        }
    }
    Json(response)
}

/// Pick a room from the search results
#[utoipa::path(
    get,
    path = "/choose-room/{id}",
    tag = "booking",
    params(("id" = i32, Path, description = "Room ID")),
    responses((status = 303, description = "To the reservation form, or back to search"))
)]
pub async fn choose_room(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
) -> AppResult<Page> {
    let Ok(room_id) = id.parse::<i32>() else {
        return redirect_with(&session, SessionKey::Error, "Missing url parameter", SEARCH_PAGE).await;
    };

    match state.services.booking.choose_room(&session, room_id).await {
        Ok(_) => Ok(Page::Redirect("/make-reservation".to_string())),
        Err(e) => recover(&session, e, SEARCH_PAGE).await,
    }
}

/// Start a draft from a direct booking link
#[utoipa::path(
    get,
    path = "/book-room",
    tag = "booking",
    params(BookRoomQuery),
    responses((status = 303, description = "To the reservation form, or back to search"))
)]
pub async fn book_room(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Query(query): Query<BookRoomQuery>,
) -> AppResult<Page> {
    let Ok(room_id) = query.id.trim().parse::<i32>() else {
        return redirect_with(&session, SessionKey::Error, "Missing url parameter", SEARCH_PAGE).await;
    };
    let dates = parse_date(&query.s).and_then(|start| Ok((start, parse_date(&query.e)?)));
    let result = match dates {
        Ok((start, end)) => state.services.booking.book_room(&session, room_id, start, end).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(_) => Ok(Page::Redirect("/make-reservation".to_string())),
        Err(e) => recover(&session, e, SEARCH_PAGE).await,
    }
}

/// Guest details form for the current draft
#[utoipa::path(
    get,
    path = "/make-reservation",
    tag = "booking",
    responses(
        (status = 200, description = "Reservation form", body = TemplateData),
        (status = 303, description = "No draft in session")
    )
)]
pub async fn make_reservation(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> AppResult<Page> {
    let draft = match state.services.booking.current_draft(&session).await {
        Ok(draft) => draft,
        Err(e) => return recover(&session, e, SEARCH_PAGE).await,
    };

    let page = TemplateData::new("make-reservation.page.tmpl")
        .string("start_date", format_date(draft.start_date))
        .string("end_date", format_date(draft.end_date))
        .data("reservation", &draft)?;
    render(&session, page).await
}

/// Confirm the draft with the guest's details
#[utoipa::path(
    post,
    path = "/make-reservation",
    tag = "booking",
    responses(
        (status = 200, description = "Form with field errors", body = TemplateData),
        (status = 303, description = "Confirmed, or sent back to search")
    )
)]
pub async fn post_make_reservation(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Form(form): Form<HashMap<String, String>>,
) -> AppResult<Page> {
    match state.services.booking.confirm(&session, form).await {
        Ok(ConfirmOutcome::Confirmed(_)) => Ok(Page::Redirect("/reservation-summary".to_string())),
        Ok(ConfirmOutcome::Invalid { form, draft }) => {
            let page = TemplateData::new("make-reservation.page.tmpl")
                .string("start_date", format_date(draft.start_date))
                .string("end_date", format_date(draft.end_date))
                .data("reservation", &draft)?
                .form(form);
            render(&session, page).await
        }
        Ok(ConfirmOutcome::Unavailable) => {
            redirect_with(&session, SessionKey::Error, "Room no longer available", SEARCH_PAGE).await
        }
        Err(e) => recover(&session, e, SEARCH_PAGE).await,
    }
}

/// Summary of the confirmed reservation, shown once
#[utoipa::path(
    get,
    path = "/reservation-summary",
    tag = "booking",
    responses(
        (status = 200, description = "Reservation summary", body = TemplateData),
        (status = 303, description = "Nothing to show")
    )
)]
pub async fn reservation_summary(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> AppResult<Page> {
    let draft = match state.services.booking.summary(&session).await {
        Ok(draft) => draft,
        Err(e) => return recover(&session, e, SEARCH_PAGE).await,
    };

    let page = TemplateData::new("reservation-summary.page.tmpl")
        .string("start_date", format_date(draft.start_date))
        .string("end_date", format_date(draft.end_date))
        .data("reservation", &draft)?;
    render(&session, page).await
}

fn parse_stay(
    form: &HashMap<String, String>,
    start_field: &str,
    end_field: &str,
) -> AppResult<(chrono::NaiveDate, chrono::NaiveDate)> {
    let field = |name: &str| form.get(name).map(String::as_str).unwrap_or("");
    Ok((parse_date(field(start_field))?, parse_date(field(end_field))?))
}
