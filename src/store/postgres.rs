//! PostgreSQL + pgvector [`Store`] implementation.
//!
//! Vectors travel as text literals (`[f1,f2,...]`) cast to `vector` inside
//! the statement; nearest-neighbour ordering uses the cosine distance
//! operator `<=>`.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::embedding::vector_literal;
use crate::error::{Error, Result};
use crate::models::{HistoryRecord, IndexedUnit, UnitDistance};

use super::{DocumentCount, Store, StoreStats, TenantCount, TenantDocumentCount};

/// PostgreSQL implementation of the [`Store`] trait.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode_distance(row: &PgRow) -> Result<UnitDistance> {
    let decode = |e: sqlx::Error| Error::RowDecode(e.to_string());
    Ok(UnitDistance {
        content: row.try_get("content").map_err(decode)?,
        source_document: row.try_get("source_document").map_err(decode)?,
        tenant_id: row.try_get("tenant_id").map_err(decode)?,
        sequence_index: row.try_get("sequence_index").map_err(decode)?,
        distance: row.try_get("distance").map_err(decode)?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn delete_document(&self, tenant_id: &str, source_document: &str) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM indexed_units WHERE tenant_id = $1 AND source_document = $2")
                .bind(tenant_id)
                .bind(source_document)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn insert_unit(&self, unit: &IndexedUnit) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO indexed_units (tenant_id, source_document, sequence_index, content, embedding)
            VALUES ($1, $2, $3, $4, $5::vector)
            "#,
        )
        .bind(&unit.tenant_id)
        .bind(&unit.source_document)
        .bind(unit.sequence_index)
        .bind(&unit.content)
        .bind(vector_literal(&unit.embedding))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn nearest(
        &self,
        tenant_id: &str,
        query_vec: &[f32],
        limit: i64,
    ) -> Result<Vec<Result<UnitDistance>>> {
        let rows = sqlx::query(
            r#"
            SELECT content, source_document, tenant_id, sequence_index,
                   (embedding <=> $1::vector)::float8 AS distance
            FROM indexed_units
            WHERE tenant_id = $2
            ORDER BY embedding <=> $1::vector
            LIMIT $3
            "#,
        )
        .bind(vector_literal(query_vec))
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(decode_distance).collect())
    }

    async fn upsert_history(&self, record: &HistoryRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO document_history (tenant_id, source_document, last_updated_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (tenant_id, source_document) DO UPDATE SET
                last_updated_by = EXCLUDED.last_updated_by,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&record.tenant_id)
        .bind(&record.source_document)
        .bind(&record.last_updated_by)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn history(
        &self,
        tenant_id: &str,
        source_document: &str,
    ) -> Result<Option<HistoryRecord>> {
        let row = sqlx::query(
            r#"
            SELECT tenant_id, source_document, last_updated_by, updated_at
            FROM document_history
            WHERE tenant_id = $1 AND source_document = $2
            "#,
        )
        .bind(tenant_id)
        .bind(source_document)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(HistoryRecord {
                tenant_id: row.try_get("tenant_id")?,
                source_document: row.try_get("source_document")?,
                last_updated_by: row.try_get("last_updated_by")?,
                updated_at: row.try_get("updated_at")?,
            })),
            None => Ok(None),
        }
    }

    async fn delete_tenant(&self, tenant_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM indexed_units WHERE tenant_id = $1")
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count_units(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM indexed_units")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let total = self.count_units().await?;

        let by_tenant = sqlx::query(
            "SELECT tenant_id, COUNT(*) AS count FROM indexed_units GROUP BY tenant_id ORDER BY tenant_id",
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|row| -> std::result::Result<TenantCount, sqlx::Error> {
            Ok(TenantCount {
                tenant_id: row.try_get("tenant_id")?,
                count: row.try_get("count")?,
            })
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

        let by_document = sqlx::query(
            "SELECT source_document, COUNT(*) AS count FROM indexed_units \
             GROUP BY source_document ORDER BY source_document",
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|row| -> std::result::Result<DocumentCount, sqlx::Error> {
            Ok(DocumentCount {
                source_document: row.try_get("source_document")?,
                count: row.try_get("count")?,
            })
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

        let by_tenant_document = sqlx::query(
            "SELECT tenant_id, source_document, COUNT(*) AS count FROM indexed_units \
             GROUP BY tenant_id, source_document ORDER BY tenant_id, source_document",
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|row| -> std::result::Result<TenantDocumentCount, sqlx::Error> {
            Ok(TenantDocumentCount {
                tenant_id: row.try_get("tenant_id")?,
                source_document: row.try_get("source_document")?,
                count: row.try_get("count")?,
            })
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(StoreStats {
            total,
            by_tenant,
            by_document,
            by_tenant_document,
        })
    }
}
