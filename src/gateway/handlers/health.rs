//! Health check handler

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use utoipa::ToSchema;

use super::super::state::AppState;

/// Health check response data
#[derive(serde::Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: &'static str,
    /// Crate version
    #[schema(example = "0.1.0")]
    pub version: &'static str,
    /// Short commit hash the binary was built from
    #[schema(example = "3f2c1ab")]
    pub git_hash: &'static str,
}

/// Health check endpoint
///
/// Pings PostgreSQL when the service runs against a database. Failure
/// details are logged, not returned.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse, content_type = "application/json"),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    ),
    tag = "System"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let healthy = match state.pg_db.as_ref() {
        Some(db) => match db.health_check().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "[HEALTH] PostgreSQL ping failed");
                false
            }
        },
        None => true,
    };

    let (code, status) = if healthy {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            git_hash: env!("GIT_HASH"),
        }),
    )
}
