use axum::http::StatusCode;
use bookings_server::{
    models::{restriction::RESTRICTION_OWNER_BLOCK, NewRoomRestriction},
    repository::BookingRepository,
};
use chrono::NaiveDate;

use crate::TestApp;

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[tokio::test]
async fn test_guest_books_a_room() {
    let mut app = TestApp::new();

    let response = app
        .post_form("/search-availability", &[("start", "2024-06-01"), ("end", "2024-06-03")])
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.template(), "choose-room.page.tmpl");
    assert_eq!(response.body["data"]["rooms"].as_array().unwrap().len(), 2);

    app.get("/choose-room/2").await.assert_redirect("/make-reservation");

    let response = app.get("/make-reservation").await;
    assert_eq!(response.template(), "make-reservation.page.tmpl");
    assert_eq!(response.body["string_map"]["start_date"], "2024-06-01");
    assert_eq!(response.body["data"]["reservation"]["room_name"], "Major's Suite");

    let response = app
        .post_form(
            "/make-reservation",
            &[
                ("first_name", "Al"),
                ("last_name", "Smith"),
                ("email", "al@smith.com"),
                ("phone", "555"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.template(), "make-reservation.page.tmpl");
    assert!(response.body["form"]["errors"]["first_name"].is_array());
    assert!(app.repo.reservations().await.is_empty());

    app.post_form(
        "/make-reservation",
        &[
            ("first_name", "John"),
            ("last_name", "Smith"),
            ("email", "john@smith.com"),
            ("phone", "555"),
        ],
    )
    .await
    .assert_redirect("/reservation-summary");

    let reservations = app.repo.reservations().await;
    assert_eq!(reservations.len(), 1);
    assert_eq!(reservations[0].room_id, 2);
    let restrictions = app.repo.restrictions().await;
    assert_eq!(restrictions.len(), 1);
    assert_eq!(restrictions[0].reservation_id, Some(reservations[0].id));

    let guest_mail = app.mail.recv().await.unwrap();
    assert_eq!(guest_mail.to, "john@smith.com");
    assert_eq!(guest_mail.subject, "Reservation Confirmation");
    let staff_mail = app.mail.recv().await.unwrap();
    assert_eq!(staff_mail.to, "staff@here.com");

    let response = app.get("/reservation-summary").await;
    assert_eq!(response.template(), "reservation-summary.page.tmpl");
    assert_eq!(response.body["data"]["reservation"]["guest"]["first_name"], "John");

    app.get("/reservation-summary")
        .await
        .assert_redirect("/search-availability");
    let response = app.get("/search-availability").await;
    assert_eq!(response.body["error"], "Can't get reservation from session");
}

#[tokio::test]
async fn test_no_availability_redirects_to_search() {
    let mut app = TestApp::new();
    for room_id in [1, 2] {
        app.repo
            .insert_room_restriction(&NewRoomRestriction {
                start_date: d("2050-01-01"),
                end_date: d("2060-01-01"),
                room_id,
                reservation_id: None,
                restriction_id: RESTRICTION_OWNER_BLOCK,
            })
            .await
            .unwrap();
    }

    app.post_form("/search-availability", &[("start", "2050-01-01"), ("end", "2050-01-05")])
        .await
        .assert_redirect("/search-availability");

    let response = app.get("/search-availability").await;
    assert_eq!(response.body["error"], "No availability");

    // one-shot
    let response = app.get("/search-availability").await;
    assert_eq!(response.body["error"], "");
}

#[tokio::test]
async fn test_invalid_dates_are_rejected() {
    let mut app = TestApp::new();
    app.post_form("/search-availability", &[("start", "2024-06-05"), ("end", "2024-06-01")])
        .await
        .assert_redirect("/search-availability");
    app.post_form("/search-availability", &[("start", "junk"), ("end", "2024-06-01")])
        .await
        .assert_redirect("/search-availability");
    assert!(app.repo.reservations().await.is_empty());
}

#[tokio::test]
async fn test_direct_booking_link() {
    let mut app = TestApp::new();
    app.get("/book-room?id=1&s=2024-06-01&e=2024-06-04")
        .await
        .assert_redirect("/make-reservation");

    let response = app.get("/make-reservation").await;
    assert_eq!(response.body["data"]["reservation"]["room_name"], "General's Quarters");
    assert_eq!(response.body["string_map"]["end_date"], "2024-06-04");

    app.get("/book-room?id=7&s=2024-06-01&e=2024-06-04")
        .await
        .assert_redirect("/search-availability");
}

#[tokio::test]
async fn test_malformed_booking_link() {
    let mut app = TestApp::new();
    app.get("/book-room?id=abc&s=2024-06-01&e=2024-06-04")
        .await
        .assert_redirect("/search-availability");
    let response = app.get("/search-availability").await;
    assert_eq!(response.body["error"], "Missing url parameter");

    app.get("/book-room?s=2024-06-01")
        .await
        .assert_redirect("/search-availability");
    assert!(app.repo.reservations().await.is_empty());
}

#[tokio::test]
async fn test_choose_room_without_search() {
    let mut app = TestApp::new();
    app.get("/choose-room/1").await.assert_redirect("/search-availability");
    app.get("/make-reservation").await.assert_redirect("/search-availability");
}

#[tokio::test]
async fn test_availability_json() {
    let mut app = TestApp::new();
    app.repo
        .insert_block_for_room_restriction(1, d("2024-06-10"))
        .await
        .unwrap();

    let response = app
        .post_form(
            "/search-availability-json",
            &[("start", "2024-06-09"), ("end", "2024-06-12"), ("room_id", "1")],
        )
        .await;
    assert_eq!(response.body["ok"], false);
    assert_eq!(response.body["room_id"], "1");

    let response = app
        .post_form(
            "/search-availability-json",
            &[("start", "2024-06-11"), ("end", "2024-06-12"), ("room_id", "1")],
        )
        .await;
    assert_eq!(response.body["ok"], true);
    assert_eq!(response.body["start_date"], "2024-06-11");
}

#[tokio::test]
async fn test_availability_json_reversed_dates() {
    let mut app = TestApp::new();
    let response = app
        .post_form(
            "/search-availability-json",
            &[("start", "2024-06-12"), ("end", "2024-06-09"), ("room_id", "1")],
        )
        .await;
    assert_eq!(response.body["ok"], false);
    assert_eq!(response.body["message"], "Invalid dates");
}
