//! Staff login and logout

use std::collections::HashMap;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{error::AppResult, services::auth::LoginOutcome, AppState};

use super::{
    page::{recover, render, Page, TemplateData},
    session_cookie_for, CurrentSession,
};

/// Login form
#[utoipa::path(
    get,
    path = "/user/login",
    tag = "auth",
    responses((status = 200, description = "Login page", body = TemplateData))
)]
pub async fn login_page(CurrentSession(session): CurrentSession) -> AppResult<Page> {
    render(&session, TemplateData::new("login.page.tmpl")).await
}

/// Check credentials and open an admin session
#[utoipa::path(
    post,
    path = "/user/login",
    tag = "auth",
    responses(
        (status = 200, description = "Form with field errors", body = TemplateData),
        (status = 303, description = "Logged in, or back to the login page")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    jar: CookieJar,
    Form(form): Form<HashMap<String, String>>,
) -> AppResult<Response> {
    match state.services.auth.login(&session, form).await {
        Ok(LoginOutcome::LoggedIn { session: renewed, .. }) => {
            let jar = jar.add(session_cookie_for(&state.config.session, renewed.id()));
            Ok((jar, Page::Redirect("/admin/dashboard".to_string())).into_response())
        }
        Ok(LoginOutcome::Invalid(form)) => {
            let page = render(&session, TemplateData::new("login.page.tmpl").form(form)).await?;
            Ok(page.into_response())
        }
        Err(e) => Ok(recover(&session, e, "/user/login").await?.into_response()),
    }
}

/// Drop the session and issue a new session id
#[utoipa::path(
    get,
    path = "/user/logout",
    tag = "auth",
    responses((status = 303, description = "Back to the login page"))
)]
pub async fn logout(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    jar: CookieJar,
) -> AppResult<Response> {
    let fresh = state.services.auth.logout(&session).await?;
    let jar = jar.add(session_cookie_for(&state.config.session, fresh.id()));
    Ok((jar, Page::Redirect("/user/login".to_string())).into_response())
}
