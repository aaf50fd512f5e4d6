//! Admin area: reservation lists, reservation editing and the calendar

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Form,
};
use chrono::{Datelike, Local};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppResult,
    models::dates::{format_date, shift_month},
    services::{reservations::UpdateOutcome, session::SessionKey},
    AppState,
};

use super::{
    page::{recover, redirect_with, render, Page, TemplateData},
    AdminUser, CurrentSession,
};

const CALENDAR_PAGE: &str = "/admin/reservations-calendar";

/// Calendar month selector
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MonthQuery {
    /// Year, 4 digits
    pub y: Option<i32>,
    /// Month, 1-12
    pub m: Option<u32>,
}

fn calendar_url(year: i32, month: u32) -> String {
    format!("{}?y={}&m={:02}", CALENDAR_PAGE, year, month)
}

/// Page a reservation action returns to
fn back_to(src: &str, year: Option<i32>, month: Option<u32>) -> String {
    match (src, year, month) {
        ("cal", Some(y), Some(m)) => calendar_url(y, m),
        ("cal", _, _) => CALENDAR_PAGE.to_string(),
        _ => format!("/admin/reservations-{}", src),
    }
}

/// Admin landing page
#[utoipa::path(
    get,
    path = "/admin/dashboard",
    tag = "admin",
    responses(
        (status = 200, description = "Dashboard", body = TemplateData),
        (status = 303, description = "Not logged in")
    )
)]
pub async fn dashboard(_admin: AdminUser, CurrentSession(session): CurrentSession) -> AppResult<Page> {
    render(&session, TemplateData::new("admin-dashboard.page.tmpl")).await
}

/// Reservations not yet processed
#[utoipa::path(
    get,
    path = "/admin/reservations-new",
    tag = "admin",
    responses((status = 200, description = "Unprocessed reservations", body = TemplateData))
)]
pub async fn new_reservations(
    State(state): State<AppState>,
    _admin: AdminUser,
    CurrentSession(session): CurrentSession,
) -> AppResult<Page> {
    let reservations = state.services.reservations.unprocessed().await?;
    let page = TemplateData::new("admin-new-reservations.page.tmpl").data("reservations", &reservations)?;
    render(&session, page).await
}

/// Every reservation
#[utoipa::path(
    get,
    path = "/admin/reservations-all",
    tag = "admin",
    responses((status = 200, description = "All reservations", body = TemplateData))
)]
pub async fn all_reservations(
    State(state): State<AppState>,
    _admin: AdminUser,
    CurrentSession(session): CurrentSession,
) -> AppResult<Page> {
    let reservations = state.services.reservations.all().await?;
    let page = TemplateData::new("admin-all-reservations.page.tmpl").data("reservations", &reservations)?;
    render(&session, page).await
}

/// Month calendar of every room; defaults to the current month
#[utoipa::path(
    get,
    path = "/admin/reservations-calendar",
    tag = "admin",
    params(MonthQuery),
    responses((status = 200, description = "Calendar month", body = TemplateData))
)]
pub async fn reservations_calendar(
    State(state): State<AppState>,
    _admin: AdminUser,
    CurrentSession(session): CurrentSession,
    Query(query): Query<MonthQuery>,
) -> AppResult<Page> {
    let today = Local::now().date_naive();
    let year = query.y.unwrap_or(today.year());
    let month = query.m.unwrap_or(today.month());

    let calendar = match state.services.calendar.show(&session, year, month).await {
        Ok(calendar) => calendar,
        Err(e) => return recover(&session, e, "/admin/dashboard").await,
    };

    let (next_year, next_month) = shift_month(year, month, 1);
    let (last_year, last_month) = shift_month(year, month, -1);
    let rooms: Vec<_> = calendar.rooms.iter().map(|r| &r.room).collect();

    let mut page = TemplateData::new("admin-reservations-calendar.page.tmpl")
        .string("this_month", format!("{:02}", month))
        .string("this_month_year", format!("{:04}", year))
        .string("next_month", format!("{:02}", next_month))
        .string("next_month_year", format!("{:04}", next_year))
        .string("last_month", format!("{:02}", last_month))
        .string("last_month_year", format!("{:04}", last_year))
        .string("first_day", format_date(calendar.first_day))
        .int("days_in_month", calendar.days_in_month() as i64)
        .data("rooms", &rooms)?;
    for room in &calendar.rooms {
        page = page
            .data(&format!("reservation_map_{}", room.room.id), &room.reservations)?
            .data(&format!("block_map_{}", room.room.id), &room.blocks)?;
    }
    render(&session, page).await
}

/// Apply block changes posted from the calendar
#[utoipa::path(
    post,
    path = "/admin/reservations-calendar",
    tag = "admin",
    responses((status = 303, description = "Back to the posted month"))
)]
pub async fn post_reservations_calendar(
    State(state): State<AppState>,
    _admin: AdminUser,
    CurrentSession(session): CurrentSession,
    Form(form): Form<HashMap<String, String>>,
) -> AppResult<Page> {
    let posted_month = form
        .get("y")
        .and_then(|y| y.trim().parse::<i32>().ok())
        .zip(form.get("m").and_then(|m| m.trim().parse::<u32>().ok()));
    let Some((year, month)) = posted_month else {
        return redirect_with(&session, SessionKey::Error, "Invalid month", CALENDAR_PAGE).await;
    };

    match state.services.calendar.reconcile(&session, year, month, &form).await {
        Ok(report) if report.failed > 0 => {
            redirect_with(
                &session,
                SessionKey::Warning,
                &format!("{} change(s) could not be saved", report.failed),
                &calendar_url(year, month),
            )
            .await
        }
        Ok(_) => redirect_with(&session, SessionKey::Flash, "Changes saved", &calendar_url(year, month)).await,
        Err(e) => recover(&session, e, &calendar_url(year, month)).await,
    }
}

/// One reservation, editable
#[utoipa::path(
    get,
    path = "/admin/reservations/{src}/{id}/show",
    tag = "admin",
    params(
        ("src" = String, Path, description = "Listing the page was opened from: new, all or cal"),
        ("id" = i32, Path, description = "Reservation ID"),
        MonthQuery
    ),
    responses((status = 200, description = "Reservation", body = TemplateData))
)]
pub async fn show_reservation(
    State(state): State<AppState>,
    _admin: AdminUser,
    CurrentSession(session): CurrentSession,
    Path((src, id)): Path<(String, i32)>,
    Query(query): Query<MonthQuery>,
) -> AppResult<Page> {
    let reservation = match state.services.reservations.get(id).await {
        Ok(reservation) => reservation,
        Err(e) => return recover(&session, e, &back_to(&src, query.y, query.m)).await,
    };

    let mut page = TemplateData::new("admin-reservations-show.page.tmpl")
        .string("src", src)
        .data("reservation", &reservation)?;
    if let (Some(y), Some(m)) = (query.y, query.m) {
        page = page.string("year", y.to_string()).string("month", format!("{:02}", m));
    }
    render(&session, page).await
}

/// Save edited guest fields
#[utoipa::path(
    post,
    path = "/admin/reservations/{src}/{id}/show",
    tag = "admin",
    params(
        ("src" = String, Path, description = "Listing the page was opened from: new, all or cal"),
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Form with field errors", body = TemplateData),
        (status = 303, description = "Saved")
    )
)]
pub async fn post_show_reservation(
    State(state): State<AppState>,
    _admin: AdminUser,
    CurrentSession(session): CurrentSession,
    Path((src, id)): Path<(String, i32)>,
    Form(form): Form<HashMap<String, String>>,
) -> AppResult<Page> {
    let year = form.get("year").and_then(|y| y.trim().parse::<i32>().ok());
    let month = form.get("month").and_then(|m| m.trim().parse::<u32>().ok());
    let back = match (year, month) {
        (Some(y), Some(m)) => calendar_url(y, m),
        _ => back_to(&src, None, None),
    };

    match state.services.reservations.update(id, form).await {
        Ok(UpdateOutcome::Updated) => redirect_with(&session, SessionKey::Flash, "Changes saved", &back).await,
        Ok(UpdateOutcome::Invalid(form)) => {
            let reservation = state.services.reservations.get(id).await?;
            let page = TemplateData::new("admin-reservations-show.page.tmpl")
                .string("src", src)
                .data("reservation", &reservation)?
                .form(form);
            render(&session, page).await
        }
        Err(e) => recover(&session, e, &back).await,
    }
}

/// Mark a reservation as processed
#[utoipa::path(
    get,
    path = "/admin/process-reservation/{src}/{id}/do",
    tag = "admin",
    params(
        ("src" = String, Path, description = "Listing to return to"),
        ("id" = i32, Path, description = "Reservation ID"),
        MonthQuery
    ),
    responses((status = 303, description = "Back to the listing"))
)]
pub async fn process_reservation(
    State(state): State<AppState>,
    _admin: AdminUser,
    CurrentSession(session): CurrentSession,
    Path((src, id)): Path<(String, i32)>,
    Query(query): Query<MonthQuery>,
) -> AppResult<Page> {
    let back = back_to(&src, query.y, query.m);
    match state.services.reservations.mark_processed(id).await {
        Ok(()) => redirect_with(&session, SessionKey::Flash, "Reservation marked as processed", &back).await,
        Err(e) => recover(&session, e, &back).await,
    }
}

/// Delete a reservation and free its room-days
#[utoipa::path(
    get,
    path = "/admin/delete-reservation/{src}/{id}/do",
    tag = "admin",
    params(
        ("src" = String, Path, description = "Listing to return to"),
        ("id" = i32, Path, description = "Reservation ID"),
        MonthQuery
    ),
    responses((status = 303, description = "Back to the listing"))
)]
pub async fn delete_reservation(
    State(state): State<AppState>,
    _admin: AdminUser,
    CurrentSession(session): CurrentSession,
    Path((src, id)): Path<(String, i32)>,
    Query(query): Query<MonthQuery>,
) -> AppResult<Page> {
    let back = back_to(&src, query.y, query.m);
    match state.services.reservations.delete(id).await {
        Ok(()) => redirect_with(&session, SessionKey::Flash, "Reservation deleted", &back).await,
        Err(e) => recover(&session, e, &back).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_to() {
        assert_eq!(back_to("new", None, None), "/admin/reservations-new");
        assert_eq!(back_to("all", Some(2024), Some(3)), "/admin/reservations-all");
        assert_eq!(back_to("cal", Some(2024), Some(7)), "/admin/reservations-calendar?y=2024&m=07");
        assert_eq!(back_to("cal", None, None), "/admin/reservations-calendar");
    }
}
