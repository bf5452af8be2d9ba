//! Request authentication for Axum.
//!
//! Verification flow:
//! 1. All four `x-annotator-*` headers must be present (names are matched
//!    case-insensitively by `HeaderMap`).
//! 2. The consumer key must resolve in the credential store.
//! 3. The token must equal `sha256(secret + user_id + issue_time)`.
//! 4. The issue time must not lie in the future, and its age must not
//!    exceed the consumer's ttl. There is no grace window: an age of
//!    exactly `ttl` seconds is still accepted, `ttl + 1` is not.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use super::{
    consumer::ConsumerStore,
    error::AuthError,
    token::{self, parse_issue_time},
};
use crate::clock::Clock;

pub const CONSUMER_KEY_HEADER: &str = "x-annotator-consumer-key";
pub const AUTH_TOKEN_HEADER: &str = "x-annotator-auth-token";
pub const ISSUE_TIME_HEADER: &str = "x-annotator-auth-token-issue-time";
pub const USER_ID_HEADER: &str = "x-annotator-user-id";

/// Identity proven by a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub consumer_key: String,
}

/// The identity handlers act for.
///
/// With authentication enabled this is always the verified user. With it
/// disabled it is whatever `x-annotator-user-id` says, possibly nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestUser(pub Option<String>);

impl RequestUser {
    pub fn user_id(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// Resolves consumers and checks tokens against an injected clock.
#[derive(Clone)]
pub struct Authenticator {
    consumers: Arc<dyn ConsumerStore>,
    clock: Arc<dyn Clock>,
    lookup_timeout: Duration,
}

impl Authenticator {
    pub fn new(consumers: Arc<dyn ConsumerStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            consumers,
            clock,
            lookup_timeout: Duration::from_secs(5),
        }
    }

    /// Bound on a single credential store lookup.
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Authenticate a request from its headers.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, AuthError> {
        // Step 1: Required headers
        let consumer_key = required_header(headers, CONSUMER_KEY_HEADER)?;
        let auth_token = required_header(headers, AUTH_TOKEN_HEADER)?;
        let issue_time = required_header(headers, ISSUE_TIME_HEADER)?;
        let user_id = required_header(headers, USER_ID_HEADER)?;

        // Step 2: Resolve consumer
        let consumer = tokio::time::timeout(self.lookup_timeout, self.consumers.lookup(consumer_key))
            .await
            .map_err(|_| AuthError::StoreUnavailable("consumer lookup timed out".into()))?
            .map_err(|e| AuthError::StoreUnavailable(e.to_string()))?
            .ok_or(AuthError::ConsumerUnknown)?;

        // Step 3: Recompute and compare token
        if !token::verify(auth_token, &consumer.secret, user_id, issue_time) {
            return Err(AuthError::TokenMismatch);
        }

        // Step 4: Freshness
        check_freshness(issue_time, consumer.ttl, self.clock.now())?;

        Ok(AuthenticatedUser {
            user_id: user_id.to_string(),
            consumer_key: consumer.key,
        })
    }
}

/// Check an issue time against `now` and an optional ttl in seconds.
pub fn check_freshness(
    issue_time: &str,
    ttl: Option<i64>,
    now: DateTime<Utc>,
) -> Result<(), AuthError> {
    let issued = parse_issue_time(issue_time).ok_or(AuthError::InvalidIssueTime)?;
    let age = now.timestamp() - issued.timestamp();

    if age < 0 {
        return Err(AuthError::TokenNotYetValid);
    }
    match ttl {
        Some(ttl) if age > ttl => Err(AuthError::TokenExpired),
        _ => Ok(()),
    }
}

/// The asserted user id, without implying it was verified.
pub fn get_request_userid(headers: &HeaderMap) -> Option<String> {
    header_value(headers, USER_ID_HEADER).map(str::to_string)
}

/// Header bytes decoded as UTF-8; identities may be non-ASCII.
fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| std::str::from_utf8(v.as_bytes()).ok())
        .filter(|v| !v.is_empty())
}

fn required_header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, AuthError> {
    header_value(headers, name).ok_or(AuthError::HeaderMissing(name))
}

/// Authentication state shared across requests.
#[derive(Clone)]
pub struct AuthState {
    pub authenticator: Authenticator,
    /// When false, requests pass through and act for the asserted user id.
    pub enabled: bool,
}

/// Axum middleware for consumer-token authentication.
///
/// Injects [`RequestUser`] (and [`AuthenticatedUser`] when verified) into
/// request extensions. Must wrap every annotation route.
pub async fn auth_middleware(
    State(auth): State<Arc<AuthState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    if !auth.enabled {
        let user = RequestUser(get_request_userid(request.headers()));
        request.extensions_mut().insert(user);
        return Ok(next.run(request).await);
    }

    let outcome = auth.authenticator.authenticate(request.headers()).await;
    match outcome {
        Ok(user) => {
            tracing::debug!(user_id = %user.user_id, consumer = %user.consumer_key, "request authenticated");
            request
                .extensions_mut()
                .insert(RequestUser(Some(user.user_id.clone())));
            request.extensions_mut().insert(user);
            Ok(next.run(request).await)
        }
        Err(e) if e.is_infrastructure() => {
            tracing::error!(error = %e, path = %request.uri().path(), "consumer store unavailable during authentication");
            Err(e)
        }
        Err(e) => {
            tracing::warn!(
                reason = e.name(),
                consumer = header_value(request.headers(), CONSUMER_KEY_HEADER).unwrap_or("-"),
                method = %request.method(),
                path = %request.uri().path(),
                "authentication rejected"
            );
            Err(e)
        }
    }
}
