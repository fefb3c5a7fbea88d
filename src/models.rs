//! Core data models used throughout shop-rag.
//!
//! These types represent the chunks, persisted units and search matches
//! that flow through the indexing and retrieval pipeline.

use serde::Serialize;

/// A bounded slice of a document's text, the atomic unit of indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 1-based, contiguous within one ingestion run.
    pub sequence_index: i32,
    pub text: String,
    pub source_document: String,
    pub tenant_id: String,
}

/// A persisted, searchable chunk with its embedding.
#[derive(Debug, Clone)]
pub struct IndexedUnit {
    pub content: String,
    pub source_document: String,
    pub tenant_id: String,
    pub sequence_index: i32,
    pub embedding: Vec<f32>,
}

/// A unit returned from the datastore's nearest-neighbour query.
#[derive(Debug, Clone)]
pub struct UnitDistance {
    pub content: String,
    pub source_document: String,
    pub tenant_id: String,
    pub sequence_index: i32,
    /// Cosine distance in `[0, 2]`.
    pub distance: f64,
}

/// A similarity search hit that cleared the relevance cutoff.
#[derive(Debug, Clone, Serialize)]
pub struct RankedMatch {
    pub content: String,
    pub source_document: String,
    pub tenant_id: String,
    pub sequence_index: i32,
    pub similarity: f64,
}

/// One keyword occurrence in a document, with surrounding lines.
#[derive(Debug, Clone, Serialize)]
pub struct TextMatch {
    pub file_path: String,
    /// 1-based line number of the matched line.
    pub line_number: usize,
    pub context_lines: Vec<String>,
    /// Position of the matched line within `context_lines`.
    pub matched_line_offset: usize,
}

/// The per-document ingestion history row.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryRecord {
    pub tenant_id: String,
    pub source_document: String,
    pub last_updated_by: String,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
