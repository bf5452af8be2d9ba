pub mod annotations;
#[cfg(feature = "test-consumer")]
pub mod consumer;
pub mod health;

pub use health::{HealthResponse, health_check};
