//! Consumer-token authentication.
//!
//! ## Components
//! - `consumer`: Consumer model and credential store contract
//! - `repository`: Postgres credential store
//! - `token`: Token derivation and verification
//! - `error`: Authentication error types
//! - `middleware`: Request authenticator and Axum middleware

pub mod consumer;
pub mod error;
pub mod middleware;
pub mod repository;
pub mod token;

// Re-export for convenience
pub use consumer::{Consumer, ConsumerStore, ConsumerStoreError, MemoryConsumerStore};
pub use error::AuthError;
pub use middleware::{
    AUTH_TOKEN_HEADER, AuthState, AuthenticatedUser, Authenticator, CONSUMER_KEY_HEADER,
    ISSUE_TIME_HEADER, RequestUser, USER_ID_HEADER, auth_middleware, check_freshness,
    get_request_userid,
};
pub use repository::PgConsumerStore;
pub use token::{ISSUE_TIME_FORMAT, derive, format_issue_time, parse_issue_time, verify};
