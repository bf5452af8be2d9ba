//! Registered API consumers and the credential store contract.
//!
//! A consumer is looked up by key on every authenticated request. The core
//! never mutates the store; registration is an administrative action.

use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt;
use thiserror::Error;

/// A registered API client.
#[derive(Clone, PartialEq, Eq)]
pub struct Consumer {
    pub key: String,
    /// Shared secret. Never transmitted, never logged.
    pub secret: String,
    /// Token validity window in seconds. `None` disables expiry.
    pub ttl: Option<i64>,
}

impl Consumer {
    pub fn new(key: impl Into<String>, secret: impl Into<String>, ttl: Option<i64>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
            ttl,
        }
    }
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// The backing store could not answer.
#[derive(Error, Debug)]
pub enum ConsumerStoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Consumer store unavailable: {0}")]
    Unavailable(String),
}

/// Credential store lookup.
///
/// `Ok(None)` is the normal "not registered" outcome; `Err` is reserved for
/// the store itself being unreachable.
#[async_trait]
pub trait ConsumerStore: Send + Sync {
    async fn lookup(&self, key: &str) -> Result<Option<Consumer>, ConsumerStoreError>;
}

/// In-memory consumer registry.
///
/// Lookups are lock-free reads on a sharded map.
#[derive(Default)]
pub struct MemoryConsumerStore {
    consumers: DashMap<String, Consumer>,
}

impl MemoryConsumerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a consumer.
    pub fn insert(&self, consumer: Consumer) {
        self.consumers.insert(consumer.key.clone(), consumer);
    }

    pub fn remove(&self, key: &str) -> Option<Consumer> {
        self.consumers.remove(key).map(|(_, c)| c)
    }

    pub fn len(&self) -> usize {
        self.consumers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty()
    }
}

impl FromIterator<Consumer> for MemoryConsumerStore {
    fn from_iter<I: IntoIterator<Item = Consumer>>(iter: I) -> Self {
        let store = Self::new();
        for consumer in iter {
            store.insert(consumer);
        }
        store
    }
}

#[async_trait]
impl ConsumerStore for MemoryConsumerStore {
    async fn lookup(&self, key: &str) -> Result<Option<Consumer>, ConsumerStoreError> {
        Ok(self.consumers.get(key).map(|c| c.value().clone()))
    }
}
