//! Annotator Store
//!
//! ```text
//! ┌──────────┐    ┌──────────────┐    ┌───────────┐    ┌──────────────┐
//! │  Client  │───▶│ Auth (token) │───▶│  Handler  │───▶│    Store     │
//! │          │    │  x-annotator │    │ (policy)  │    │ (PG / memory)│
//! └──────────┘    └──────────────┘    └───────────┘    └──────────────┘
//! ```
//!
//! Usage: `annotator-store [--env dev] [--port 5000]`

use std::sync::Arc;

use annotator_store::annotation::{AnnotationStore, MemoryAnnotationStore, PgAnnotationStore};
use annotator_store::auth::{
    AuthState, Authenticator, Consumer, ConsumerStore, MemoryConsumerStore, PgConsumerStore,
};
use annotator_store::clock::{Clock, SystemClock};
use annotator_store::config::{AppConfig, TestConsumerConfig};
use annotator_store::db::{Database, ensure_schema};
use annotator_store::gateway::{AppState, run_server};
use annotator_store::logging::init_logging;

fn get_arg(long: &str, short: Option<&str>) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        let hit = args[i] == long || short.is_some_and(|s| args[i] == s);
        if hit && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

fn get_env() -> String {
    get_arg("--env", Some("-e")).unwrap_or_else(|| "dev".to_string())
}

fn get_port() -> anyhow::Result<Option<u16>> {
    get_arg("--port", None)
        .map(|p| {
            p.parse()
                .map_err(|_| anyhow::anyhow!("Invalid --port value: {}", p))
        })
        .transpose()
}

fn test_consumer(config: &TestConsumerConfig) -> Consumer {
    Consumer::new(config.key.clone(), config.secret.clone(), config.ttl)
}

struct Stores {
    annotations: Arc<dyn AnnotationStore>,
    consumers: Arc<dyn ConsumerStore>,
    db: Option<Arc<Database>>,
}

async fn open_stores(config: &AppConfig) -> anyhow::Result<Stores> {
    match &config.postgres_url {
        Some(url) => {
            let db = Arc::new(Database::connect(url).await?);
            ensure_schema(&db).await?;

            let consumers = PgConsumerStore::new(db.clone());
            if let Some(tc) = &config.test_consumer {
                consumers.upsert(&test_consumer(tc)).await?;
                tracing::info!(consumer = %tc.key, "test consumer registered");
            }

            Ok(Stores {
                annotations: Arc::new(PgAnnotationStore::new(db.clone())),
                consumers: Arc::new(consumers),
                db: Some(db),
            })
        }
        None => {
            tracing::warn!("postgres_url not set, using in-memory stores (data is lost on exit)");
            let consumers = MemoryConsumerStore::new();
            if let Some(tc) = &config.test_consumer {
                consumers.insert(test_consumer(tc));
                tracing::info!(consumer = %tc.key, "test consumer registered");
            }

            Ok(Stores {
                annotations: Arc::new(MemoryAnnotationStore::new()),
                consumers: Arc::new(consumers),
                db: None,
            })
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let mut config = AppConfig::load(&env)?;
    if let Some(port) = get_port()? {
        config.server.port = port;
    }

    let _guard = init_logging(&config);
    tracing::info!(env = %env, version = env!("CARGO_PKG_VERSION"), git_hash = env!("GIT_HASH"), "starting annotator store");

    let stores = open_stores(&config).await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let auth = Arc::new(AuthState {
        authenticator: Authenticator::new(stores.consumers, clock),
        enabled: config.auth_on,
    });

    let mut state = AppState::new(stores.annotations, auth)
        .with_test_consumer(config.test_consumer.clone());
    if let Some(db) = stores.db {
        state = state.with_database(db);
    }

    if let Err(e) = run_server(&config.server, Arc::new(state)).await {
        tracing::error!(error = %e, "server stopped");
        return Err(e);
    }
    Ok(())
}
