//! Indexing pipeline.
//!
//! Turns a document's chunks into persisted, searchable units:
//!
//! 1. Delete every existing unit of `(tenant, document)`.
//! 2. Queue all chunk indices on a shared job queue.
//! 3. A fixed pool of workers (`indexing.workers`) pulls indices, embeds
//!    the chunk and inserts one unit per chunk, reporting each outcome on
//!    a tally channel.
//! 4. Once every chunk has been attempted, successes are counted and the
//!    document's history record is upserted.
//!
//! A failed chunk is logged and counted; it never stops its worker. The
//! delete and the inserts are not wrapped in a transaction, so a search
//! running concurrently with a re-index can see a partially filled
//! document.

use std::path::{Component, Path};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

use crate::chunk::{chunk_text, make_chunks, sanitize_bytes, sanitize_text};
use crate::context::AppContext;
use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::models::{Chunk, HistoryRecord, IndexedUnit};
use crate::store::Store;

/// Outcome of one indexing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexReport {
    pub persisted: usize,
    pub total: usize,
}

impl IndexReport {
    pub fn is_complete(&self) -> bool {
        self.persisted == self.total
    }

    pub fn failed(&self) -> usize {
        self.total - self.persisted
    }

    /// `Err(PartialIngestion)` unless every chunk was persisted.
    pub fn into_result(self) -> Result<Self> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(Error::PartialIngestion {
                persisted: self.persisted,
                total: self.total,
            })
        }
    }
}

fn require(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::malformed(format!("{} must not be empty", what)));
    }
    Ok(())
}

/// Index `chunks` as the new content of `(tenant_id, source_document)`,
/// recording the configured default user in the history.
pub async fn index_document(
    ctx: &AppContext,
    tenant_id: &str,
    source_document: &str,
    chunks: Vec<Chunk>,
) -> Result<IndexReport> {
    index_document_as(
        ctx,
        tenant_id,
        source_document,
        chunks,
        &ctx.config.indexing.updated_by,
    )
    .await
}

pub async fn index_document_as(
    ctx: &AppContext,
    tenant_id: &str,
    source_document: &str,
    chunks: Vec<Chunk>,
    updated_by: &str,
) -> Result<IndexReport> {
    require(tenant_id, "tenant id")?;
    require(source_document, "document name")?;

    let removed = ctx.store.delete_document(tenant_id, source_document).await?;
    if removed > 0 {
        tracing::info!(tenant_id, source_document, removed, "removed previous units");
    }

    let total = chunks.len();
    let persisted = run_workers(
        Arc::clone(&ctx.store),
        Arc::clone(&ctx.embedder),
        chunks,
        ctx.config.indexing.workers,
    )
    .await;

    let record = HistoryRecord {
        tenant_id: tenant_id.to_string(),
        source_document: source_document.to_string(),
        last_updated_by: updated_by.to_string(),
        updated_at: Utc::now(),
    };
    if let Err(e) = ctx.store.upsert_history(&record).await {
        tracing::warn!(tenant_id, source_document, error = %e, "failed to record document history");
    }

    let report = IndexReport { persisted, total };
    if report.is_complete() {
        tracing::info!(tenant_id, source_document, total, "document indexed");
    } else {
        tracing::warn!(
            tenant_id,
            source_document,
            persisted,
            total,
            "document partially indexed"
        );
    }
    Ok(report)
}

/// Embed and insert every chunk on a pool of `workers` tasks. Returns the
/// number of chunks persisted.
async fn run_workers(
    store: Arc<dyn Store>,
    embedder: Arc<dyn Embedder>,
    chunks: Vec<Chunk>,
    workers: usize,
) -> usize {
    let total = chunks.len();
    if total == 0 {
        return 0;
    }

    let chunks = Arc::new(chunks);
    let (job_tx, job_rx) = mpsc::channel::<usize>(total);
    for i in 0..total {
        if job_tx.send(i).await.is_err() {
            break;
        }
    }
    drop(job_tx);

    let job_rx = Arc::new(Mutex::new(job_rx));
    let (tally_tx, mut tally_rx) = mpsc::channel::<bool>(total);

    let mut pool = JoinSet::new();
    for _ in 0..workers.max(1) {
        let job_rx = Arc::clone(&job_rx);
        let tally_tx = tally_tx.clone();
        let chunks = Arc::clone(&chunks);
        let store = Arc::clone(&store);
        let embedder = Arc::clone(&embedder);

        pool.spawn(async move {
            loop {
                let next = job_rx.lock().await.recv().await;
                let Some(i) = next else {
                    break;
                };
                let ok = match index_chunk(store.as_ref(), embedder.as_ref(), &chunks[i]).await {
                    Ok(()) => true,
                    Err(e) => {
                        let chunk = &chunks[i];
                        tracing::warn!(
                            tenant_id = %chunk.tenant_id,
                            source_document = %chunk.source_document,
                            sequence_index = chunk.sequence_index,
                            error = %e,
                            "chunk not indexed"
                        );
                        false
                    }
                };
                if tally_tx.send(ok).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(tally_tx);

    while let Some(joined) = pool.join_next().await {
        if let Err(e) = joined {
            tracing::warn!(error = %e, "indexing worker panicked");
        }
    }

    let mut persisted = 0;
    while let Some(ok) = tally_rx.recv().await {
        if ok {
            persisted += 1;
        }
    }
    persisted
}

async fn index_chunk(store: &dyn Store, embedder: &dyn Embedder, chunk: &Chunk) -> Result<()> {
    let content = sanitize_text(&chunk.text);
    let embedding = embedder.embed(&content).await?;
    if embedding.len() != embedder.dims() {
        return Err(Error::backend(
            "embedding",
            format!(
                "{} returned {} dimensions, expected {}",
                embedder.model_name(),
                embedding.len(),
                embedder.dims()
            ),
        ));
    }
    let unit = IndexedUnit {
        content,
        source_document: chunk.source_document.clone(),
        tenant_id: chunk.tenant_id.clone(),
        sequence_index: chunk.sequence_index,
        embedding,
    };
    store.insert_unit(&unit).await
}

/// Reject names that would escape the documents directory.
fn validate_filename(filename: &str) -> Result<()> {
    require(filename, "filename")?;
    let escapes = Path::new(filename)
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(Error::malformed(format!(
            "filename must be a relative path inside the documents directory: {}",
            filename
        )));
    }
    Ok(())
}

/// Read `<docs_root>/<filename>`, chunk it and index it for `tenant_id`.
pub async fn build_document(
    ctx: &AppContext,
    tenant_id: &str,
    filename: &str,
    updated_by: &str,
) -> Result<IndexReport> {
    require(tenant_id, "tenant id")?;
    validate_filename(filename)?;

    let path = ctx.config.server.docs_root.join(filename);
    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::NotFound {
                kind: "document",
                name: filename.to_string(),
            })
        }
        Err(e) => return Err(e.into()),
    };

    let text = sanitize_bytes(&bytes);
    let texts = chunk_text(&text, ctx.config.chunking.max_chars);
    tracing::info!(tenant_id, filename, chunks = texts.len(), "document chunked");

    let chunks = make_chunks(tenant_id, filename, texts);
    index_document_as(ctx, tenant_id, filename, chunks, updated_by).await
}

/// Delete every unit of a tenant. Returns the number of units removed.
pub async fn purge_tenant(ctx: &AppContext, tenant_id: &str) -> Result<u64> {
    require(tenant_id, "tenant id")?;
    let removed = ctx.store.delete_tenant(tenant_id).await?;
    tracing::info!(tenant_id, removed, "tenant purged");
    Ok(removed)
}
