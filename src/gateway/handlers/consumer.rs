//! Development token endpoint.
//!
//! [SECURITY] Only compiled with the `test-consumer` feature and only routed
//! when a test consumer is configured. Anyone who can reach it can act as
//! the configured user.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;
use utoipa::ToSchema;

use super::super::error::{ApiError, ApiResult};
use super::super::state::AppState;
use crate::auth::token;

/// Everything a client needs to fill the `x-annotator-*` headers.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub consumer_key: String,
    pub auth_token: String,
    #[schema(example = "2024-03-01T12:00:00")]
    pub auth_token_issue_time: String,
    pub user_id: String,
    /// Seconds; absent when tokens never expire
    pub ttl: Option<i64>,
}

/// Issue a token for the test consumer
///
/// GET /auth/token
#[utoipa::path(
    get,
    path = "/auth/token",
    responses(
        (status = 200, description = "Fresh token", body = TokenResponse, content_type = "application/json"),
        (status = 404, description = "No test consumer configured")
    ),
    tag = "Development"
)]
pub async fn issue_token(State(state): State<Arc<AppState>>) -> ApiResult<Json<TokenResponse>> {
    let consumer = state
        .test_consumer
        .as_ref()
        .ok_or(ApiError::NotFound("No test consumer configured."))?;

    let issue_time = token::format_issue_time(state.auth.authenticator.clock().now());
    let auth_token = token::derive(&consumer.secret, &consumer.user, &issue_time);

    tracing::debug!(consumer = %consumer.key, user = %consumer.user, "issued test token");
    Ok(Json(TokenResponse {
        consumer_key: consumer.key.clone(),
        auth_token,
        auth_token_issue_time: issue_time,
        user_id: consumer.user.clone(),
        ttl: consumer.ttl,
    }))
}
