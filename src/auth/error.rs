//! Authentication error types.
//!
//! Every variant reaches the client as the same 401 body so a caller cannot
//! tell a missing header from an unknown consumer or a stale token. The
//! variants exist for logging.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Message returned for any authentication failure.
pub const UNAUTHORIZED_MESSAGE: &str =
    "Cannot authorise request. Perhaps you didn't send the x-annotator headers?";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing required header: {0}")]
    HeaderMissing(&'static str),

    #[error("Unknown consumer")]
    ConsumerUnknown,

    #[error("Token does not match")]
    TokenMismatch,

    #[error("Issue time is not a valid timestamp")]
    InvalidIssueTime,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token issue time is in the future")]
    TokenNotYetValid,

    #[error("Consumer store unavailable: {0}")]
    StoreUnavailable(String),
}

impl AuthError {
    /// Stable name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::HeaderMissing(_) => "HEADER_MISSING",
            Self::ConsumerUnknown => "CONSUMER_UNKNOWN",
            Self::TokenMismatch => "TOKEN_MISMATCH",
            Self::InvalidIssueTime => "INVALID_ISSUE_TIME",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TokenNotYetValid => "TOKEN_NOT_YET_VALID",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
        }
    }

    /// Infrastructure trouble rather than a rejected credential.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }

    pub fn http_status(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }
}

/// JSON response body for auth errors.
#[derive(Debug, Serialize)]
pub struct AuthErrorResponse {
    pub error: &'static str,
    pub message: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = AuthErrorResponse {
            error: "UNAUTHORIZED",
            message: UNAUTHORIZED_MESSAGE,
        };
        (self.http_status(), Json(body)).into_response()
    }
}
