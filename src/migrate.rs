use anyhow::Result;
use sqlx::PgPool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool, config.embedding.dims).await?;
    pool.close().await;
    Ok(())
}

/// Schema statements, in execution order. The vector index is created
/// separately since it may fail on an empty table.
pub fn schema_statements(dims: usize) -> Vec<String> {
    vec![
        "CREATE EXTENSION IF NOT EXISTS vector".to_string(),
        // One row per embedded chunk
        format!(
            r#"
        CREATE TABLE IF NOT EXISTS indexed_units (
            id BIGSERIAL PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            source_document TEXT NOT NULL,
            sequence_index INTEGER NOT NULL,
            content TEXT NOT NULL,
            embedding vector({}) NOT NULL,
            UNIQUE (tenant_id, source_document, sequence_index)
        )
        "#,
            dims
        ),
        r#"
        CREATE TABLE IF NOT EXISTS document_history (
            tenant_id TEXT NOT NULL,
            source_document TEXT NOT NULL,
            last_updated_by TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
            PRIMARY KEY (tenant_id, source_document)
        )
        "#
        .to_string(),
        // Tables created before the key existed get it here
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_units_key \
         ON indexed_units(tenant_id, source_document, sequence_index)"
            .to_string(),
    ]
}

const VECTOR_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_units_embedding ON indexed_units \
     USING ivfflat (embedding vector_cosine_ops) WITH (lists = 100)";

/// Create the extension, tables and indexes. Idempotent.
pub async fn apply_schema(pool: &PgPool, dims: usize) -> Result<()> {
    for statement in schema_statements(dims) {
        sqlx::query(&statement).execute(pool).await?;
    }

    // ivfflat needs rows to train its lists; on an empty table this can fail
    if let Err(e) = sqlx::query(VECTOR_INDEX).execute(pool).await {
        tracing::warn!(error = %e, "could not create vector index, continuing without it");
    }

    Ok(())
}
