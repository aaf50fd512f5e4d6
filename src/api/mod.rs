//! HTTP handlers for the booking site and the admin area

pub mod admin;
pub mod auth;
pub mod booking;
pub mod health;
pub mod openapi;
pub mod page;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::SET_COOKIE, request::Parts},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::{
    config::SessionConfig,
    error::AppError,
    services::session::{Session, SessionKey},
    AppState,
};

/// Id of the client's session, set by [`session_cookie`]
#[derive(Debug, Clone)]
pub struct SessionId(pub String);

/// Session cookie carrying `id`, with the configured security flags
pub fn session_cookie_for(settings: &SessionConfig, id: &str) -> Cookie<'static> {
    Cookie::build((settings.cookie_name.clone(), id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.secure_cookie)
        .build()
}

/// Attach a session id to every request, issuing the cookie when absent
pub async fn session_cookie(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let settings = &state.config.session;
    let existing = jar
        .get(&settings.cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty());

    let (id, fresh) = match existing {
        Some(id) => (id, false),
        None => (Uuid::new_v4().to_string(), true),
    };
    request.extensions_mut().insert(SessionId(id.clone()));

    let response = next.run(request).await;
    // Handlers that renew the session set their own cookie
    if !fresh || sets_cookie(&response, &settings.cookie_name) {
        return response;
    }

    (jar.add(session_cookie_for(settings, &id)), response).into_response()
}

fn sets_cookie(response: &Response, name: &str) -> bool {
    let prefix = format!("{name}=");
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with(&prefix))
}

/// The requesting client's session
pub struct CurrentSession(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let SessionId(id) = parts
            .extensions
            .get::<SessionId>()
            .cloned()
            .ok_or_else(|| AppError::Internal("Session layer is not installed".to_string()))?;
        Ok(CurrentSession(state.services.sessions.session(id)))
    }
}

/// Logged-in staff user; anonymous requests are sent to the login page
pub struct AdminUser(pub i32);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentSession(session) = CurrentSession::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        match session.get::<i32>(SessionKey::UserId).await {
            Ok(Some(user_id)) => Ok(AdminUser(user_id)),
            Ok(None) => {
                tracing::debug!(session = session.id(), path = %parts.uri.path(), "Anonymous admin request");
                if let Err(e) = session.put(SessionKey::Error, &"Log in first!").await {
                    return Err(e.into_response());
                }
                Err(Redirect::to("/user/login").into_response())
            }
            Err(e) => Err(e.into_response()),
        }
    }
}

/// Every route, with the session and tracing layers applied
pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/reservations-new", get(admin::new_reservations))
        .route("/reservations-all", get(admin::all_reservations))
        .route(
            "/reservations-calendar",
            get(admin::reservations_calendar).post(admin::post_reservations_calendar),
        )
        .route(
            "/reservations/:src/:id/show",
            get(admin::show_reservation).post(admin::post_show_reservation),
        )
        .route("/process-reservation/:src/:id/do", get(admin::process_reservation))
        .route("/delete-reservation/:src/:id/do", get(admin::delete_reservation));

    let site = Router::new()
        .route(
            "/search-availability",
            get(booking::search_availability).post(booking::post_search_availability),
        )
        .route("/search-availability-json", post(booking::availability_json))
        .route("/choose-room/:id", get(booking::choose_room))
        .route("/book-room", get(booking::book_room))
        .route(
            "/make-reservation",
            get(booking::make_reservation).post(booking::post_make_reservation),
        )
        .route("/reservation-summary", get(booking::reservation_summary))
        .route("/user/login", get(auth::login_page).post(auth::login))
        .route("/user/logout", get(auth::logout))
        .nest("/admin", admin)
        .layer(middleware::from_fn_with_state(state.clone(), session_cookie));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(site)
        .with_state(state)
        .merge(openapi::create_openapi_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}
