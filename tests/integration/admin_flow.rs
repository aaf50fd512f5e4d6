use axum::http::StatusCode;
use bookings_server::{
    models::{NewReservation, User},
    repository::BookingRepository,
    services::auth::hash_password,
};
use chrono::NaiveDate;

use crate::TestApp;

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

async fn logged_in() -> TestApp {
    logged_in_with(TestApp::new()).await
}

async fn logged_in_with(mut app: TestApp) -> TestApp {
    app.repo
        .add_user(User {
            id: 1,
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
            email: "admin@admin.com".to_string(),
            password: hash_password("password").unwrap(),
            access_level: 3,
            created_at: None,
            updated_at: None,
        })
        .await;

    app.post_form("/user/login", &[("email", "admin@admin.com"), ("password", "password")])
        .await
        .assert_redirect("/admin/dashboard");
    app
}

#[tokio::test]
async fn test_admin_requires_login() {
    let mut app = TestApp::new();
    app.get("/admin/dashboard").await.assert_redirect("/user/login");

    let response = app.get("/user/login").await;
    assert_eq!(response.template(), "login.page.tmpl");
    assert_eq!(response.body["error"], "Log in first!");
}

#[tokio::test]
async fn test_login_and_logout() {
    let mut app = logged_in().await;

    let response = app.get("/admin/dashboard").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["flash"], "Logged in!");
    assert_eq!(response.body["is_authenticated"], true);

    app.get("/user/logout").await.assert_redirect("/user/login");
    app.get("/admin/dashboard").await.assert_redirect("/user/login");
}

#[tokio::test]
async fn test_login_replaces_session_id() {
    let planted = "bookings_session=planted-id".to_string();
    let mut app = TestApp::new();
    app.cookie = Some(planted.clone());
    let mut app = logged_in_with(app).await;
    let renewed = app.cookie.clone().unwrap();
    assert_ne!(renewed, planted);

    app.cookie = Some(planted);
    app.get("/admin/reservations-all").await.assert_redirect("/user/login");

    app.cookie = Some(renewed.clone());
    assert_eq!(app.get("/admin/reservations-all").await.status, StatusCode::OK);

    app.get("/user/logout").await.assert_redirect("/user/login");
    assert_ne!(app.cookie.as_deref(), Some(renewed.as_str()));

    app.cookie = Some(renewed);
    app.get("/admin/dashboard").await.assert_redirect("/user/login");
}

#[tokio::test]
async fn test_wrong_password() {
    let mut app = logged_in().await;
    app.get("/user/logout").await;

    app.post_form("/user/login", &[("email", "admin@admin.com"), ("password", "nope")])
        .await
        .assert_redirect("/user/login");
    let response = app.get("/user/login").await;
    assert_eq!(response.body["error"], "Invalid login credentials");
}

#[tokio::test]
async fn test_calendar_blocks() {
    let mut app = logged_in().await;
    app.repo
        .insert_block_for_room_restriction(1, d("2024-07-03"))
        .await
        .unwrap();

    let response = app.get("/admin/reservations-calendar?y=2024&m=7").await;
    assert_eq!(response.template(), "admin-reservations-calendar.page.tmpl");
    assert_eq!(response.body["int_map"]["days_in_month"], 31);
    assert_eq!(response.body["string_map"]["this_month"], "07");
    assert_eq!(response.body["string_map"]["next_month"], "08");
    assert_eq!(response.body["string_map"]["last_month"], "06");
    let blocks = response.body["data"]["block_map_1"].as_object().unwrap();
    assert_eq!(blocks.len(), 31);
    assert_ne!(blocks["2024-07-03"], 0);

    // unchecking the 3rd removes it, a new block goes on room 2
    app.post_form(
        "/admin/reservations-calendar",
        &[("y", "2024"), ("m", "7"), ("add_block_2_2024-07-5", "1")],
    )
    .await
    .assert_redirect("/admin/reservations-calendar?y=2024&m=07");

    let restrictions = app.repo.restrictions().await;
    assert_eq!(restrictions.len(), 1);
    assert_eq!(restrictions[0].room_id, 2);
    assert_eq!(restrictions[0].start_date, d("2024-07-05"));

    let response = app.get("/admin/reservations-calendar?y=2024&m=07").await;
    assert_eq!(response.body["flash"], "Changes saved");
    assert_ne!(response.body["data"]["block_map_2"]["2024-07-05"], 0);
}

#[tokio::test]
async fn test_reservation_admin_actions() {
    let mut app = logged_in().await;
    let id = app
        .repo
        .insert_reservation(&NewReservation {
            first_name: "John".to_string(),
            last_name: "Smith".to_string(),
            email: "john@smith.com".to_string(),
            phone: String::new(),
            start_date: d("2024-07-01"),
            end_date: d("2024-07-04"),
            room_id: 1,
        })
        .await
        .unwrap();

    let response = app.get("/admin/reservations-new").await;
    assert_eq!(response.body["data"]["reservations"].as_array().unwrap().len(), 1);

    let response = app.get(&format!("/admin/reservations/new/{}/show", id)).await;
    assert_eq!(response.body["data"]["reservation"]["room_name"], "General's Quarters");

    app.post_form(
        &format!("/admin/reservations/cal/{}/show", id),
        &[
            ("first_name", "Jane"),
            ("last_name", "Smith"),
            ("email", "jane@smith.com"),
            ("year", "2024"),
            ("month", "07"),
        ],
    )
    .await
    .assert_redirect("/admin/reservations-calendar?y=2024&m=07");

    app.get(&format!("/admin/process-reservation/new/{}/do", id))
        .await
        .assert_redirect("/admin/reservations-new");
    let response = app.get("/admin/reservations-new").await;
    assert!(response.body["data"]["reservations"].as_array().unwrap().is_empty());
    assert_eq!(response.body["flash"], "Reservation marked as processed");

    let response = app.get("/admin/reservations-all").await;
    assert_eq!(response.body["data"]["reservations"][0]["first_name"], "Jane");

    app.get(&format!("/admin/delete-reservation/cal/{}/do?y=2024&m=07", id))
        .await
        .assert_redirect("/admin/reservations-calendar?y=2024&m=07");
    assert!(app.repo.reservations().await.is_empty());
}
