use std::sync::Arc;

use crate::annotation::AnnotationStore;
use crate::auth::AuthState;
use crate::config::TestConsumerConfig;
use crate::db::Database;

/// Gateway application state (shared)
#[derive(Clone)]
pub struct AppState {
    /// Annotation storage
    pub annotations: Arc<dyn AnnotationStore>,
    /// Consumer-token authentication
    pub auth: Arc<AuthState>,
    /// Consumer the token endpoint issues for, if configured
    pub test_consumer: Option<TestConsumerConfig>,
    /// PostgreSQL pool when running against a database (health checks)
    pub pg_db: Option<Arc<Database>>,
}

impl AppState {
    pub fn new(annotations: Arc<dyn AnnotationStore>, auth: Arc<AuthState>) -> Self {
        Self {
            annotations,
            auth,
            test_consumer: None,
            pg_db: None,
        }
    }

    pub fn with_test_consumer(mut self, consumer: Option<TestConsumerConfig>) -> Self {
        self.test_consumer = consumer;
        self
    }

    pub fn with_database(mut self, db: Arc<Database>) -> Self {
        self.pg_db = Some(db);
        self
    }
}
