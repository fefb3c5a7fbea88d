//! In-memory [`Store`] implementation for tests and `--memory` runs.
//!
//! Units live in a `Vec` behind a `tokio::sync::RwLock`; nearest-neighbour
//! search is brute-force cosine distance over the tenant's units.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::embedding::cosine_similarity;
use crate::error::Result;
use crate::models::{HistoryRecord, IndexedUnit, UnitDistance};

use super::{DocumentCount, Store, StoreStats, TenantCount, TenantDocumentCount};

/// In-memory store.
pub struct InMemoryStore {
    units: RwLock<Vec<IndexedUnit>>,
    history: RwLock<HashMap<(String, String), HistoryRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            units: RwLock::new(Vec::new()),
            history: RwLock::new(HashMap::new()),
        }
    }

    /// Snapshot of the persisted units of one document, ordered by index.
    pub async fn units_for(&self, tenant_id: &str, source_document: &str) -> Vec<IndexedUnit> {
        let units = self.units.read().await;
        let mut found: Vec<IndexedUnit> = units
            .iter()
            .filter(|u| u.tenant_id == tenant_id && u.source_document == source_document)
            .cloned()
            .collect();
        found.sort_by_key(|u| u.sequence_index);
        found
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn delete_document(&self, tenant_id: &str, source_document: &str) -> Result<u64> {
        let mut units = self.units.write().await;
        let before = units.len();
        units.retain(|u| !(u.tenant_id == tenant_id && u.source_document == source_document));
        Ok((before - units.len()) as u64)
    }

    async fn insert_unit(&self, unit: &IndexedUnit) -> Result<()> {
        self.units.write().await.push(unit.clone());
        Ok(())
    }

    async fn nearest(
        &self,
        tenant_id: &str,
        query_vec: &[f32],
        limit: i64,
    ) -> Result<Vec<Result<UnitDistance>>> {
        let units = self.units.read().await;
        let mut scored: Vec<UnitDistance> = units
            .iter()
            .filter(|u| u.tenant_id == tenant_id)
            .map(|u| UnitDistance {
                content: u.content.clone(),
                source_document: u.source_document.clone(),
                tenant_id: u.tenant_id.clone(),
                sequence_index: u.sequence_index,
                distance: 1.0 - cosine_similarity(query_vec, &u.embedding) as f64,
            })
            .collect();

        scored.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit.max(0) as usize);

        Ok(scored.into_iter().map(Ok).collect())
    }

    async fn upsert_history(&self, record: &HistoryRecord) -> Result<()> {
        let key = (record.tenant_id.clone(), record.source_document.clone());
        self.history.write().await.insert(key, record.clone());
        Ok(())
    }

    async fn history(
        &self,
        tenant_id: &str,
        source_document: &str,
    ) -> Result<Option<HistoryRecord>> {
        let history = self.history.read().await;
        Ok(history
            .get(&(tenant_id.to_string(), source_document.to_string()))
            .cloned())
    }

    async fn delete_tenant(&self, tenant_id: &str) -> Result<u64> {
        let mut units = self.units.write().await;
        let before = units.len();
        units.retain(|u| u.tenant_id != tenant_id);
        Ok((before - units.len()) as u64)
    }

    async fn count_units(&self) -> Result<i64> {
        Ok(self.units.read().await.len() as i64)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let units = self.units.read().await;

        let mut by_tenant: BTreeMap<&str, i64> = BTreeMap::new();
        let mut by_document: BTreeMap<&str, i64> = BTreeMap::new();
        let mut by_pair: BTreeMap<(&str, &str), i64> = BTreeMap::new();

        for u in units.iter() {
            *by_tenant.entry(&u.tenant_id).or_insert(0) += 1;
            *by_document.entry(&u.source_document).or_insert(0) += 1;
            *by_pair
                .entry((&u.tenant_id, &u.source_document))
                .or_insert(0) += 1;
        }

        Ok(StoreStats {
            total: units.len() as i64,
            by_tenant: by_tenant
                .into_iter()
                .map(|(t, count)| TenantCount {
                    tenant_id: t.to_string(),
                    count,
                })
                .collect(),
            by_document: by_document
                .into_iter()
                .map(|(d, count)| DocumentCount {
                    source_document: d.to_string(),
                    count,
                })
                .collect(),
            by_tenant_document: by_pair
                .into_iter()
                .map(|((t, d), count)| TenantDocumentCount {
                    tenant_id: t.to_string(),
                    source_document: d.to_string(),
                    count,
                })
                .collect(),
        })
    }
}
