//! Embedding backend abstraction and vector utilities.
//!
//! Defines the [`Embedder`] trait and its HTTP implementation:
//! - **[`OllamaEmbedder`]** — calls an Ollama instance's `/api/embeddings`
//!   endpoint with `{model, prompt}` and reads back `{embedding}`.
//!
//! Also provides vector helpers:
//! - [`vector_literal`] — encode a vector as pgvector's `[f1,f2,...]` literal
//! - [`cosine_similarity`] — similarity between two vectors (in-memory store)
//!
//! # Failure policy
//!
//! Any transport error, non-success status or undecodable body is a hard
//! failure for the calling operation. There is no retry here: the indexing
//! pipeline tallies the chunk as failed, similarity search fails outright.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::chunk::sanitize_text;
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

/// Trait for embedding backends.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"bge-m3"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1024`).
    fn dims(&self) -> usize;
    /// Embed a single text. Implementations sanitize their input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

// ============ Ollama ============

#[derive(Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

/// Embedding backend using an Ollama instance.
///
/// Requires the model to be pulled beforehand (e.g. `ollama pull bge-m3`).
pub struct OllamaEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    dims: usize,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Configuration(format!("http client: {}", e)))?;

        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dims: config.dims,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let prompt = sanitize_text(text);
        let body = OllamaEmbeddingRequest {
            model: &self.model,
            prompt: &prompt,
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                Error::backend(
                    "embedding",
                    format!("connection error (is Ollama running at {}?): {}", self.url, e),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Error::backend(
                "embedding",
                format!("Ollama API error {}: {}", status, body_text),
            ));
        }

        let parsed: OllamaEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::backend("embedding", format!("invalid response: {}", e)))?;

        if parsed.embedding.is_empty() {
            return Err(Error::backend("embedding", "empty embedding in response"));
        }

        Ok(parsed.embedding)
    }
}

/// Encode a vector as the datastore literal `[f1,f2,...]`.
///
/// Values are written with six decimal places.
///
/// ```rust
/// use shop_rag::embedding::vector_literal;
///
/// assert_eq!(vector_literal(&[1.0, -0.5]), "[1.000000,-0.500000]");
/// ```
pub fn vector_literal(vec: &[f32]) -> String {
    let mut out = String::with_capacity(vec.len() * 10 + 2);
    out.push('[');
    for (i, v) in vec.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&format!("{:.6}", v));
    }
    out.push(']');
    out
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors or
/// vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
