use anyhow::Result;

use super::Database;

/// Create the consumer and annotation tables if they do not exist yet.
pub async fn ensure_schema(db: &Database) -> Result<()> {
    tracing::info!("Initializing annotation store schema...");

    for (name, ddl) in [
        ("consumer", CREATE_CONSUMER_TABLE),
        ("annotation", CREATE_ANNOTATION_TABLE),
        ("range", CREATE_RANGE_TABLE),
        ("range extras", ADD_RANGE_EXTRAS),
        ("range index", CREATE_RANGE_INDEX),
    ] {
        sqlx::query(ddl)
            .execute(db.pool())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {}", name, e))?;
    }

    tracing::info!("Annotation store schema initialized");
    Ok(())
}

const CREATE_CONSUMER_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS consumer (
    key     TEXT PRIMARY KEY,
    secret  TEXT NOT NULL,
    ttl     BIGINT
)
"#;

// extras and permissions are JSON text blobs; the typed columns are the
// only ones search can push down into SQL.
const CREATE_ANNOTATION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS annotation (
    id          BIGSERIAL PRIMARY KEY,
    text        TEXT,
    "user"      TEXT,
    permissions TEXT,
    extras      TEXT
)
"#;

const CREATE_RANGE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS range (
    id              BIGSERIAL PRIMARY KEY,
    annotation_id   BIGINT NOT NULL REFERENCES annotation(id) ON DELETE CASCADE,
    position        INTEGER NOT NULL,
    start           TEXT,
    "end"           TEXT,
    start_offset    BIGINT,
    end_offset      BIGINT,
    extras          TEXT
)
"#;

// Tables created before range extras existed
const ADD_RANGE_EXTRAS: &str = "ALTER TABLE range ADD COLUMN IF NOT EXISTS extras TEXT";

const CREATE_RANGE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS range_annotation_idx ON range (annotation_id, position)";
