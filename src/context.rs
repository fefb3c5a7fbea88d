//! Application context shared by the CLI and the HTTP server.
//!
//! Built once at startup and passed by reference; holds the datastore,
//! the embedding backend, both provider chains and the tokenizer.

use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::embedding::{Embedder, OllamaEmbedder};
use crate::fallback::FallbackChain;
use crate::generate::{DeepSeekProvider, GeminiProvider, OllamaGenerator, TextGenerator};
use crate::store::memory::InMemoryStore;
use crate::store::postgres::PgStore;
use crate::store::Store;
use crate::tokenize::Tokenizer;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub embedder: Arc<dyn Embedder>,
    /// Answer synthesis: Gemini, then DeepSeek.
    pub summarizers: FallbackChain,
    /// Query expansion: local Ollama first, then the hosted providers.
    pub expanders: FallbackChain,
    pub tokenizer: Tokenizer,
}

impl AppContext {
    /// Context backed by PostgreSQL.
    pub async fn connect(config: Config) -> Result<Self> {
        let pool = db::connect(&config).await?;
        let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
        Self::with_store(config, store)
    }

    /// Context backed by a fresh in-memory store.
    pub fn in_memory(config: Config) -> Result<Self> {
        Self::with_store(config, Arc::new(InMemoryStore::new()))
    }

    /// Wire the configured HTTP backends around `store`.
    pub fn with_store(config: Config, store: Arc<dyn Store>) -> Result<Self> {
        let embedder: Arc<dyn Embedder> = Arc::new(OllamaEmbedder::new(&config.embedding)?);
        let summarizers = summarizer_chain(&config)?;
        let expanders = expander_chain(&config)?;
        let tokenizer = Tokenizer::from_config(&config.tokenizer);

        tracing::debug!(
            embedding_model = embedder.model_name(),
            dims = embedder.dims(),
            summarizers = ?summarizers.provider_names(),
            expanders = ?expanders.provider_names(),
            "provider chains ready"
        );

        Ok(Self {
            config,
            store,
            embedder,
            summarizers,
            expanders,
            tokenizer,
        })
    }
}

pub fn summarizer_chain(config: &Config) -> Result<FallbackChain> {
    let providers: Vec<Arc<dyn TextGenerator>> = vec![
        Arc::new(GeminiProvider::from_config(&config.generation)?),
        Arc::new(DeepSeekProvider::from_config(&config.generation)?),
    ];
    Ok(FallbackChain::new(providers))
}

pub fn expander_chain(config: &Config) -> Result<FallbackChain> {
    let providers: Vec<Arc<dyn TextGenerator>> = vec![
        Arc::new(OllamaGenerator::from_config(
            &config.generation,
            &config.embedding,
        )?),
        Arc::new(GeminiProvider::from_config(&config.generation)?),
        Arc::new(DeepSeekProvider::from_config(&config.generation)?),
    ];
    Ok(FallbackChain::new(providers))
}
