//! Page data handed to the rendering layer
//!
//! Handlers do not produce markup: a page is a [`TemplateData`] document
//! naming the template plus its data bag, serialized as JSON. One-shot
//! messages are moved out of the session into the page when it is rendered.

use std::collections::HashMap;

use axum::{
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    forms::Form,
    services::session::{Session, SessionKey},
};

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct TemplateData {
    /// Template identifier, e.g. `make-reservation.page.tmpl`
    pub template: String,
    pub string_map: HashMap<String, String>,
    pub int_map: HashMap<String, i64>,
    #[schema(value_type = Object)]
    pub data: HashMap<String, Value>,
    pub flash: String,
    pub error: String,
    pub warning: String,
    #[schema(value_type = Option<Object>)]
    pub form: Option<Form>,
    pub is_authenticated: bool,
}

impl TemplateData {
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
            ..Default::default()
        }
    }

    pub fn string(mut self, key: &str, value: impl Into<String>) -> Self {
        self.string_map.insert(key.to_string(), value.into());
        self
    }

    pub fn int(mut self, key: &str, value: i64) -> Self {
        self.int_map.insert(key.to_string(), value);
        self
    }

    pub fn data<T: Serialize>(mut self, key: &str, value: &T) -> AppResult<Self> {
        let value = serde_json::to_value(value)
            .map_err(|e| AppError::Internal(format!("Failed to encode page data: {}", e)))?;
        self.data.insert(key.to_string(), value);
        Ok(self)
    }

    pub fn form(mut self, form: Form) -> Self {
        self.form = Some(form);
        self
    }
}

/// What a page handler answers with
#[derive(Debug)]
pub enum Page {
    Render(TemplateData),
    /// 303 See Other
    Redirect(String),
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        match self {
            Page::Render(data) => Json(data).into_response(),
            Page::Redirect(to) => Redirect::to(&to).into_response(),
        }
    }
}

/// Fill the session-held parts of a page and render it
pub async fn render(session: &Session, mut page: TemplateData) -> AppResult<Page> {
    page.flash = session.pop_string(SessionKey::Flash).await?;
    page.error = session.pop_string(SessionKey::Error).await?;
    page.warning = session.pop_string(SessionKey::Warning).await?;
    if page.form.is_none() {
        page.form = Some(Form::default());
    }
    page.is_authenticated = session.exists(SessionKey::UserId).await?;
    Ok(Page::Render(page))
}

/// Redirect carrying a one-shot message of the given kind
pub async fn redirect_with(session: &Session, key: SessionKey, message: &str, to: &str) -> AppResult<Page> {
    session.put(key, &message).await?;
    Ok(Page::Redirect(to.to_string()))
}

/// Turn a recoverable failure into an error message plus redirect.
///
/// Session backend and internal failures are not recoverable here and are
/// returned as they are.
pub async fn recover(session: &Session, err: AppError, to: &str) -> AppResult<Page> {
    let message = match &err {
        AppError::Session(_) | AppError::Internal(_) => return Err(err),
        AppError::Database(e) => {
            tracing::error!("Database error: {:?}", e);
            "Something went wrong, please try again".to_string()
        }
        AppError::Validation(msg)
        | AppError::NotFound(msg)
        | AppError::SessionState(msg)
        | AppError::Authentication(msg) => {
            tracing::debug!("Recovered request error: {}", err);
            msg.clone()
        }
    };
    redirect_with(session, SessionKey::Error, &message, to).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::session::{MemorySessionBackend, SessionStore};
    use axum::http::{header::LOCATION, StatusCode};
    use std::sync::Arc;

    fn session() -> Session {
        SessionStore::new(Arc::new(MemorySessionBackend::new())).session("s")
    }

    #[tokio::test]
    async fn test_render_pops_messages() {
        let session = session();
        session.put(SessionKey::Flash, &"Saved").await.unwrap();

        let Page::Render(page) = render(&session, TemplateData::new("home.page.tmpl")).await.unwrap() else {
            panic!("expected a rendered page");
        };
        assert_eq!(page.flash, "Saved");
        assert_eq!(page.error, "");
        assert!(!page.is_authenticated);
        assert!(!session.exists(SessionKey::Flash).await.unwrap());
    }

    #[tokio::test]
    async fn test_recover_redirects_with_error() {
        let session = session();
        let page = recover(&session, AppError::NotFound("Room 9 not found".to_string()), "/search-availability")
            .await
            .unwrap();

        let response = page.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/search-availability");
        assert_eq!(session.pop_string(SessionKey::Error).await.unwrap(), "Room 9 not found");
    }

    #[tokio::test]
    async fn test_recover_keeps_internal_errors() {
        let session = session();
        let result = recover(&session, AppError::Internal("boom".to_string()), "/").await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
