//! Storage abstraction for shop-rag.
//!
//! The [`Store`] trait defines every datastore operation the indexing and
//! retrieval pipeline needs, so the pipeline can run against PostgreSQL
//! ([`postgres::PgStore`]) in production and against
//! [`memory::InMemoryStore`] in tests.
//!
//! Implementations must be `Send + Sync` to be shared across worker tasks.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::models::{HistoryRecord, IndexedUnit, UnitDistance};

/// Unit count for one tenant.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TenantCount {
    pub tenant_id: String,
    pub count: i64,
}

/// Unit count for one document name, across tenants.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DocumentCount {
    pub source_document: String,
    pub count: i64,
}

/// Unit count for one `(tenant, document)` pair.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TenantDocumentCount {
    pub tenant_id: String,
    pub source_document: String,
    pub count: i64,
}

/// Aggregate unit counts, each breakdown sorted by its key.
#[derive(Debug, Clone, Serialize, Default)]
pub struct StoreStats {
    pub total: i64,
    pub by_tenant: Vec<TenantCount>,
    pub by_document: Vec<DocumentCount>,
    pub by_tenant_document: Vec<TenantDocumentCount>,
}

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`delete_document`](Store::delete_document) | Drop every unit of one `(tenant, document)` |
/// | [`insert_unit`](Store::insert_unit) | Persist one embedded chunk |
/// | [`nearest`](Store::nearest) | Nearest units of a tenant by cosine distance |
/// | [`upsert_history`](Store::upsert_history) | Record who last ingested a document |
/// | [`history`](Store::history) | Read a history record |
/// | [`delete_tenant`](Store::delete_tenant) | Drop every unit of a tenant |
/// | [`count_units`](Store::count_units) | Total persisted units |
/// | [`stats`](Store::stats) | Count breakdowns |
#[async_trait]
pub trait Store: Send + Sync {
    /// Delete all units of `(tenant_id, source_document)`. Returns rows removed.
    async fn delete_document(&self, tenant_id: &str, source_document: &str) -> Result<u64>;

    async fn insert_unit(&self, unit: &IndexedUnit) -> Result<()>;

    /// Up to `limit` units of `tenant_id`, ordered by ascending cosine
    /// distance to `query_vec`.
    ///
    /// The outer error fails the query as a whole; an inner error marks a
    /// single row that could not be decoded.
    async fn nearest(
        &self,
        tenant_id: &str,
        query_vec: &[f32],
        limit: i64,
    ) -> Result<Vec<Result<UnitDistance>>>;

    async fn upsert_history(&self, record: &HistoryRecord) -> Result<()>;

    async fn history(
        &self,
        tenant_id: &str,
        source_document: &str,
    ) -> Result<Option<HistoryRecord>>;

    /// Delete all units of a tenant. Returns rows removed.
    async fn delete_tenant(&self, tenant_id: &str) -> Result<u64>;

    async fn count_units(&self) -> Result<i64>;

    async fn stats(&self) -> Result<StoreStats>;
}
