//! Annotator Store - annotation storage behind consumer-token authentication
//!
//! # Modules
//!
//! - [`auth`] - Consumer credentials, token codec, request authenticator
//! - [`annotation`] - Annotation model, wire codec, permissions, search, stores
//! - [`gateway`] - Axum router, handlers, API errors, OpenAPI document
//! - [`db`] - PostgreSQL pool and schema bootstrap
//! - [`clock`] - Injectable wall clock
//! - [`config`] / [`logging`] - Process bootstrap

pub mod annotation;
pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod gateway;
pub mod logging;

// Convenient re-exports at crate root
pub use annotation::{
    Action, Annotation, AnnotationStore, MemoryAnnotationStore, PgAnnotationStore, Range,
};
pub use auth::{AuthError, AuthState, Authenticator, Consumer, ConsumerStore, MemoryConsumerStore};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::AppConfig;
pub use gateway::{AppState, router, run_server};
