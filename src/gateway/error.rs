//! API error responses.
//!
//! Authentication failures are [`crate::auth::AuthError`]; everything a
//! handler can fail with after that lands here.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::annotation::{SchemaError, SearchError, StoreError};

pub const NOT_FOUND_MESSAGE: &str = "Annotation not found.";
pub const FORBIDDEN_MESSAGE: &str = "Could not authorise request. No permission.";
pub const NOT_CREATED_MESSAGE: &str = "No parameters given. Annotation not created.";
pub const NOT_UPDATED_MESSAGE: &str = "No parameters given. Annotation not updated.";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    BadRequest(String),

    /// Detail goes to the log, never to the client.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found() -> Self {
        Self::NotFound(NOT_FOUND_MESSAGE)
    }

    pub fn forbidden() -> Self {
        Self::Forbidden(FORBIDDEN_MESSAGE)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Internal(detail) => {
                tracing::error!(detail = %detail, "request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = ApiErrorResponse {
            error: self.code(),
            message,
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => Self::not_found(),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<SchemaError> for ApiError {
    fn from(e: SchemaError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
