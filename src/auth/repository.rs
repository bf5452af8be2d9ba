//! Consumer repository for database operations.
//!
//! Uses runtime queries to avoid sqlx compile-time database connection.

use async_trait::async_trait;
use std::sync::Arc;

use super::consumer::{Consumer, ConsumerStore, ConsumerStoreError};
use crate::db::{Database, SafeRow};

/// Postgres-backed credential store.
pub struct PgConsumerStore {
    db: Arc<Database>,
}

impl PgConsumerStore {
    /// Create a new repository with database connection.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Get a consumer by its key.
    pub async fn get_by_key(&self, key: &str) -> Result<Option<Consumer>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT key, secret, ttl
            FROM consumer
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|r| Self::row_to_consumer(&r)).transpose()
    }

    /// Register a consumer, replacing the secret and ttl of an existing key.
    pub async fn upsert(&self, consumer: &Consumer) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO consumer (key, secret, ttl)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE SET secret = EXCLUDED.secret, ttl = EXCLUDED.ttl
            "#,
        )
        .bind(&consumer.key)
        .bind(&consumer.secret)
        .bind(consumer.ttl)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    fn row_to_consumer(row: &sqlx::postgres::PgRow) -> Result<Consumer, sqlx::Error> {
        let ttl: Option<Option<i64>> = row.try_get_log("ttl");
        Ok(Consumer {
            key: row
                .try_get_log("key")
                .ok_or_else(|| sqlx::Error::ColumnNotFound("key".into()))?,
            secret: row
                .try_get_log("secret")
                .ok_or_else(|| sqlx::Error::ColumnNotFound("secret".into()))?,
            ttl: ttl.flatten(),
        })
    }
}

#[async_trait]
impl ConsumerStore for PgConsumerStore {
    async fn lookup(&self, key: &str) -> Result<Option<Consumer>, ConsumerStoreError> {
        Ok(self.get_by_key(key).await?)
    }
}
