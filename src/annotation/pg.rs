//! PostgreSQL annotation store.
//!
//! Ranges live in their own table ordered by `position`; extras and
//! permissions are JSON text columns. Filters on `id`, `text` and `user` are
//! pushed into SQL, everything else is matched after loading.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{Postgres, QueryBuilder, Row, Transaction};
use std::collections::HashMap;
use std::sync::Arc;

use super::models::{Annotation, Extras, Permissions, Range};
use super::repository::{AnnotationStore, StoreError};
use super::search::Filter;
use crate::db::Database;

const SELECT_ANNOTATION: &str = r#"SELECT id, text, "user", permissions, extras FROM annotation"#;

pub struct PgAnnotationStore {
    db: Arc<Database>,
}

impl PgAnnotationStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn row_to_annotation(row: &PgRow) -> Result<Annotation, StoreError> {
        let id: i64 = row.try_get("id")?;
        let permissions: Option<String> = row.try_get("permissions")?;
        let extras: Option<String> = row.try_get("extras")?;

        let permissions = permissions
            .map(|p| serde_json::from_str::<Permissions>(&p))
            .transpose()
            .map_err(|e| StoreError::Corrupt {
                id,
                reason: format!("permissions: {}", e),
            })?;
        let extras = match extras {
            Some(blob) => Extras::from_blob(&blob).map_err(|e| StoreError::Corrupt {
                id,
                reason: e.to_string(),
            })?,
            None => Extras::new(),
        };

        Ok(Annotation {
            id: Some(id),
            text: row.try_get("text")?,
            user: row.try_get("user")?,
            ranges: Vec::new(),
            permissions,
            extras,
        })
    }

    fn row_to_range(row: &PgRow) -> Result<(i64, Range), StoreError> {
        let annotation_id: i64 = row.try_get("annotation_id")?;
        let extras: Option<String> = row.try_get("extras")?;
        let extra = match extras {
            Some(blob) => serde_json::from_str(&blob).map_err(|e| StoreError::Corrupt {
                id: annotation_id,
                reason: format!("range extras: {}", e),
            })?,
            None => Map::new(),
        };

        Ok((
            annotation_id,
            Range {
                id: Some(row.try_get("id")?),
                start: row.try_get("start")?,
                start_offset: row.try_get("start_offset")?,
                end: row.try_get("end")?,
                end_offset: row.try_get("end_offset")?,
                extra,
            },
        ))
    }

    /// Fetch ranges for the given annotations and attach them in order.
    async fn attach_ranges(&self, annotations: &mut [Annotation]) -> Result<(), StoreError> {
        let ids: Vec<i64> = annotations.iter().filter_map(|a| a.id).collect();
        if ids.is_empty() {
            return Ok(());
        }

        let rows = sqlx::query(
            r#"
            SELECT id, annotation_id, start, "end", start_offset, end_offset, extras
            FROM range
            WHERE annotation_id = ANY($1)
            ORDER BY annotation_id, position
            "#,
        )
        .bind(&ids)
        .fetch_all(self.db.pool())
        .await?;

        let mut by_annotation: HashMap<i64, Vec<Range>> = HashMap::new();
        for row in rows {
            let (annotation_id, range) = Self::row_to_range(&row)?;
            by_annotation.entry(annotation_id).or_default().push(range);
        }
        for annotation in annotations.iter_mut() {
            if let Some(ranges) = annotation.id.and_then(|id| by_annotation.remove(&id)) {
                annotation.ranges = ranges;
            }
        }
        Ok(())
    }

    async fn insert_ranges(
        tx: &mut Transaction<'_, Postgres>,
        annotation_id: i64,
        ranges: &mut [Range],
    ) -> Result<(), sqlx::Error> {
        for (position, range) in ranges.iter_mut().enumerate() {
            let row = sqlx::query(
                r#"
                INSERT INTO range (annotation_id, position, start, "end", start_offset, end_offset, extras)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING id
                "#,
            )
            .bind(annotation_id)
            .bind(position as i32)
            .bind(&range.start)
            .bind(&range.end)
            .bind(range.start_offset)
            .bind(range.end_offset)
            .bind(Self::range_extras_blob(range))
            .fetch_one(&mut **tx)
            .await?;
            range.id = Some(row.try_get("id")?);
        }
        Ok(())
    }

    fn range_extras_blob(range: &Range) -> Option<String> {
        if range.extra.is_empty() {
            return None;
        }
        Some(Value::Object(range.extra.clone()).to_string())
    }

    fn permissions_blob(annotation: &Annotation) -> Option<String> {
        annotation
            .permissions
            .as_ref()
            .and_then(|p| serde_json::to_string(p).ok())
    }
}

#[async_trait]
impl AnnotationStore for PgAnnotationStore {
    async fn get(&self, id: i64) -> Result<Option<Annotation>, StoreError> {
        let row = sqlx::query(&format!("{} WHERE id = $1", SELECT_ANNOTATION))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut found = [Self::row_to_annotation(&row)?];
        self.attach_ranges(&mut found).await?;
        let [annotation] = found;
        Ok(Some(annotation))
    }

    async fn list(&self) -> Result<Vec<Annotation>, StoreError> {
        self.find(&[]).await
    }

    async fn find(&self, filters: &[Filter]) -> Result<Vec<Annotation>, StoreError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(SELECT_ANNOTATION);
        qb.push(" WHERE TRUE");
        for filter in filters {
            match filter.field.as_str() {
                "id" => match filter.value.parse::<i64>() {
                    Ok(id) => {
                        qb.push(" AND id = ").push_bind(id);
                    }
                    Err(_) => return Ok(Vec::new()),
                },
                "text" => {
                    qb.push(" AND text = ").push_bind(filter.value.clone());
                }
                "user" => {
                    qb.push(r#" AND "user" = "#).push_bind(filter.value.clone());
                }
                _ => {}
            }
        }
        qb.push(" ORDER BY id");

        let rows = qb.build().fetch_all(self.db.pool()).await?;
        let mut annotations = rows
            .iter()
            .map(Self::row_to_annotation)
            .collect::<Result<Vec<_>, _>>()?;
        annotations.retain(|a| filters.iter().all(|f| f.matches(a)));
        self.attach_ranges(&mut annotations).await?;
        Ok(annotations)
    }

    async fn create(&self, mut annotation: Annotation) -> Result<Annotation, StoreError> {
        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO annotation (text, "user", permissions, extras)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&annotation.text)
        .bind(&annotation.user)
        .bind(Self::permissions_blob(&annotation))
        .bind(annotation.extras.to_blob())
        .fetch_one(&mut *tx)
        .await?;
        let id: i64 = row.try_get("id")?;

        Self::insert_ranges(&mut tx, id, &mut annotation.ranges).await?;
        tx.commit().await?;

        annotation.id = Some(id);
        tracing::debug!(annotation_id = id, "annotation created");
        Ok(annotation)
    }

    async fn update(&self, mut annotation: Annotation) -> Result<Annotation, StoreError> {
        let id = annotation.id.ok_or(StoreError::MissingId)?;
        let mut tx = self.db.pool().begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE annotation
            SET text = $2, "user" = $3, permissions = $4, extras = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&annotation.text)
        .bind(&annotation.user)
        .bind(Self::permissions_blob(&annotation))
        .bind(annotation.extras.to_blob())
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }

        sqlx::query("DELETE FROM range WHERE annotation_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        Self::insert_ranges(&mut tx, id, &mut annotation.ranges).await?;
        tx.commit().await?;

        Ok(annotation)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM annotation WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
