//! Staff login against argon2 password hashes

use std::collections::HashMap;
use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::{
    error::{AppError, AppResult},
    forms::Form,
    models::User,
    repository::BookingRepository,
    services::session::{Session, SessionKey, SessionStore},
};

pub enum LoginOutcome {
    /// The login lives in `session`, under a new id
    LoggedIn { user: User, session: Session },
    Invalid(Form),
}

#[derive(Clone)]
pub struct AuthService {
    repository: Arc<dyn BookingRepository>,
    sessions: SessionStore,
}

impl AuthService {
    pub fn new(repository: Arc<dyn BookingRepository>, sessions: SessionStore) -> Self {
        Self { repository, sessions }
    }

    /// Check posted credentials and log the client in.
    ///
    /// The session is renewed first so the id the client arrived with never
    /// carries the login.
    pub async fn login(&self, session: &Session, values: HashMap<String, String>) -> AppResult<LoginOutcome> {
        let mut form = Form::new(values);
        form.required(&["email", "password"]);
        form.is_email("email");
        if !form.valid() {
            return Ok(LoginOutcome::Invalid(form));
        }

        let user = self.authenticate(form.get("email"), form.get("password")).await?;
        let session = self.sessions.renew(session).await?;
        session.put(SessionKey::UserId, &user.id).await?;
        session.put(SessionKey::Flash, &"Logged in!").await?;
        tracing::info!(user_id = user.id, "Staff user logged in");
        Ok(LoginOutcome::LoggedIn { user, session })
    }

    /// Destroy the session and hand out an empty one under a new id
    pub async fn logout(&self, session: &Session) -> AppResult<Session> {
        session.destroy().await?;
        Ok(self.sessions.fresh())
    }

    async fn authenticate(&self, email: &str, password: &str) -> AppResult<User> {
        let user = self
            .repository
            .get_user_by_email(email.trim())
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid login credentials".to_string()))?;

        if !verify_password(&user.password, password)? {
            tracing::warn!(email = %email, "Failed login attempt");
            return Err(AppError::Authentication(
                "Invalid login credentials".to_string(),
            ));
        }
        Ok(user)
    }
}

fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}
