//! Liveness check

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{config::SessionBackendKind, AppState};

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// `healthy`, or `degraded` when the repository cannot be read
    pub status: String,
    pub version: String,
    /// Rooms known to the repository
    pub rooms: usize,
    /// `redis` or `memory`
    pub sessions: String,
}

/// Report service health, reading the room list to check the repository
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Repository unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let sessions = match state.config.session.backend {
        SessionBackendKind::Redis => "redis",
        SessionBackendKind::Memory => "memory",
    };

    let (code, status, rooms) = match state.services.availability.room_count().await {
        Ok(rooms) => (StatusCode::OK, "healthy", rooms),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", 0)
        }
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            rooms,
            sessions: sessions.to_string(),
        }),
    )
}
