//! End-to-end tests driving the router with the in-memory repository,
//! in-memory sessions and a captured mail queue

mod admin_flow;
mod booking_flow;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use tokio::sync::mpsc::Receiver;
use tower::ServiceExt;

use bookings_server::{
    api,
    config::{AppConfig, SessionBackendKind},
    models::MailData,
    repository::MemoryRepository,
    services::{
        mail::Mailer,
        session::{MemorySessionBackend, SessionStore},
        Services,
    },
    AppState,
};

pub struct TestApp {
    pub app: Router,
    pub repo: Arc<MemoryRepository>,
    pub mail: Receiver<MailData>,
    cookie: Option<String>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.session.backend = SessionBackendKind::Memory;
        config.email.staff_address = "staff@here.com".to_string();

        let repo = Arc::new(MemoryRepository::with_rooms(&["General's Quarters", "Major's Suite"]));
        let (mailer, mail) = Mailer::channel(10);
        let services = Services::new(
            repo.clone(),
            SessionStore::new(Arc::new(MemorySessionBackend::new())),
            mailer,
            config.email.clone(),
        );
        let app = api::router(AppState {
            config: Arc::new(config),
            services: Arc::new(services),
        });

        Self {
            app,
            repo,
            mail,
            cookie: None,
        }
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let request = Request::builder().method("GET").uri(uri);
        self.send(request, Body::empty()).await
    }

    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        self.send(request, Body::from(body)).await
    }

    async fn send(&mut self, mut request: axum::http::request::Builder, body: Body) -> TestResponse {
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let response = self
            .app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        self.read(response).await
    }

    async fn read(&mut self, response: Response) -> TestResponse {
        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|l| l.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        TestResponse {
            status,
            location,
            body,
        }
    }
}

impl TestResponse {
    pub fn assert_redirect(&self, to: &str) {
        assert_eq!(self.status, StatusCode::SEE_OTHER, "body: {}", self.body);
        assert_eq!(self.location.as_deref(), Some(to));
    }

    pub fn template(&self) -> &str {
        self.body["template"].as_str().unwrap_or("")
    }
}

fn encode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => (b as char).to_string(),
            _ => format!("%{:02X}", b),
        })
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let mut app = TestApp::new();
    let response = app.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert_eq!(response.body["rooms"], 2);
    assert_eq!(response.body["sessions"], "memory");
}

#[tokio::test]
async fn test_session_cookie_is_issued_once() {
    let mut app = TestApp::new();
    app.get("/search-availability").await;
    let first = app.cookie.clone().unwrap();
    assert!(first.starts_with("bookings_session="));

    app.get("/search-availability").await;
    assert_eq!(app.cookie.as_deref(), Some(first.as_str()));
}
