//! Annotation persistence contract and the in-memory store.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use thiserror::Error;

use super::models::Annotation;
use super::search::Filter;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt stored annotation {id}: {reason}")]
    Corrupt { id: i64, reason: String },

    #[error("Annotation {0} not found")]
    NotFound(i64),

    #[error("Annotation has no id")]
    MissingId,
}

/// Storage for annotations.
///
/// Stores assign annotation and range ids; callers never pick them.
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<Annotation>, StoreError>;

    /// All annotations, ordered by id.
    async fn list(&self) -> Result<Vec<Annotation>, StoreError>;

    /// Annotations matching every filter, ordered by id.
    async fn find(&self, filters: &[Filter]) -> Result<Vec<Annotation>, StoreError>;

    /// Persist a new annotation. Any `id` on the input is ignored.
    async fn create(&self, annotation: Annotation) -> Result<Annotation, StoreError>;

    /// Overwrite the stored record with the same id.
    async fn update(&self, annotation: Annotation) -> Result<Annotation, StoreError>;

    /// Returns false if there was nothing to delete.
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
}

/// In-memory annotation store.
pub struct MemoryAnnotationStore {
    annotations: DashMap<i64, Annotation>,
    next_id: AtomicI64,
    next_range_id: AtomicI64,
}

impl Default for MemoryAnnotationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAnnotationStore {
    pub fn new() -> Self {
        Self {
            annotations: DashMap::new(),
            next_id: AtomicI64::new(1),
            next_range_id: AtomicI64::new(1),
        }
    }

    /// Store a record under its own id, assigning one if it has none.
    ///
    /// Used for seeding and imports; later creates never reuse the id.
    pub fn insert(&self, mut annotation: Annotation) -> Annotation {
        let id = match annotation.id {
            Some(id) => {
                self.next_id.fetch_max(id.saturating_add(1), Ordering::SeqCst);
                id
            }
            None => self.next_id.fetch_add(1, Ordering::SeqCst),
        };
        annotation.id = Some(id);
        self.assign_range_ids(&mut annotation);
        self.annotations.insert(id, annotation.clone());
        annotation
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    fn assign_range_ids(&self, annotation: &mut Annotation) {
        for range in &mut annotation.ranges {
            range.id = Some(self.next_range_id.fetch_add(1, Ordering::SeqCst));
        }
    }

    fn sorted(&self, keep: impl Fn(&Annotation) -> bool) -> Vec<Annotation> {
        let mut out: Vec<Annotation> = self
            .annotations
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        out.sort_by_key(|a| a.id);
        out
    }
}

#[async_trait]
impl AnnotationStore for MemoryAnnotationStore {
    async fn get(&self, id: i64) -> Result<Option<Annotation>, StoreError> {
        Ok(self.annotations.get(&id).map(|a| a.value().clone()))
    }

    async fn list(&self) -> Result<Vec<Annotation>, StoreError> {
        Ok(self.sorted(|_| true))
    }

    async fn find(&self, filters: &[Filter]) -> Result<Vec<Annotation>, StoreError> {
        Ok(self.sorted(|a| filters.iter().all(|f| f.matches(a))))
    }

    async fn create(&self, mut annotation: Annotation) -> Result<Annotation, StoreError> {
        annotation.id = None;
        Ok(self.insert(annotation))
    }

    async fn update(&self, mut annotation: Annotation) -> Result<Annotation, StoreError> {
        let id = annotation.id.ok_or(StoreError::MissingId)?;
        self.assign_range_ids(&mut annotation);
        let mut slot = self
            .annotations
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;
        *slot = annotation.clone();
        Ok(annotation)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.annotations.remove(&id).is_some())
    }
}
