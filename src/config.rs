use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub textsearch: TextSearchConfig,
    #[serde(default)]
    pub tokenizer: TokenizerConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    /// PostgreSQL connection URL (the database needs the pgvector extension).
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    25
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    400
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexingConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_updated_by")]
    pub updated_by: String,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            updated_by: default_updated_by(),
        }
    }
}

fn default_workers() -> usize {
    100
}
fn default_updated_by() -> String {
    "system".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_limit")]
    pub default_limit: i64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
        }
    }
}

fn default_limit() -> i64 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            model: default_embedding_model(),
            dims: default_dims(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_embedding_model() -> String {
    "bge-m3".to_string()
}
fn default_dims() -> usize {
    1024
}
fn default_timeout_secs() -> u64 {
    60
}

/// Text-generation backends used for synthesis and query expansion.
///
/// API keys are read from the environment variables named here, never
/// from the config file itself.
#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_gemini_url")]
    pub gemini_url: String,
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    #[serde(default = "default_gemini_key_env")]
    pub gemini_key_env: String,
    #[serde(default = "default_deepseek_url")]
    pub deepseek_url: String,
    #[serde(default = "default_deepseek_model")]
    pub deepseek_model: String,
    #[serde(default = "default_deepseek_key_env")]
    pub deepseek_key_env: String,
    /// Ollama base URL for expansion; falls back to `embedding.url`.
    #[serde(default)]
    pub ollama_url: Option<String>,
    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            gemini_url: default_gemini_url(),
            gemini_model: default_gemini_model(),
            gemini_key_env: default_gemini_key_env(),
            deepseek_url: default_deepseek_url(),
            deepseek_model: default_deepseek_model(),
            deepseek_key_env: default_deepseek_key_env(),
            ollama_url: None,
            ollama_model: default_ollama_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_gemini_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_gemini_model() -> String {
    "gemini-pro".to_string()
}
fn default_gemini_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}
fn default_deepseek_url() -> String {
    "https://api.deepseek.com".to_string()
}
fn default_deepseek_model() -> String {
    "deepseek-chat".to_string()
}
fn default_deepseek_key_env() -> String {
    "DEEPSEEK_API_KEY".to_string()
}
fn default_ollama_model() -> String {
    "llama3.2".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct TextSearchConfig {
    #[serde(default = "default_textsearch_root")]
    pub root: PathBuf,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_context_lines")]
    pub context_before: usize,
    #[serde(default = "default_context_lines")]
    pub context_after: usize,
    /// Worker pool size; `0` means one worker per available CPU.
    #[serde(default)]
    pub max_workers: usize,
    #[serde(default = "default_max_keywords")]
    pub max_keywords: usize,
}

impl Default for TextSearchConfig {
    fn default() -> Self {
        Self {
            root: default_textsearch_root(),
            extensions: default_extensions(),
            context_before: default_context_lines(),
            context_after: default_context_lines(),
            max_workers: 0,
            max_keywords: default_max_keywords(),
        }
    }
}

fn default_textsearch_root() -> PathBuf {
    PathBuf::from("doc")
}
fn default_extensions() -> Vec<String> {
    vec!["md".to_string()]
}
fn default_context_lines() -> usize {
    2
}
fn default_max_keywords() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TokenizerConfig {
    /// Newline-separated word list for dictionary segmentation.
    #[serde(default)]
    pub dictionary_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// Directory `build-doc` requests read their files from.
    #[serde(default = "default_textsearch_root")]
    pub docs_root: PathBuf,
}

impl GenerationConfig {
    pub fn ollama_url<'a>(&'a self, embedding: &'a EmbeddingConfig) -> &'a str {
        self.ollama_url.as_deref().unwrap_or(&embedding.url)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.db.url.trim().is_empty() {
        anyhow::bail!("db.url must not be empty");
    }

    if config.chunking.max_chars == 0 {
        anyhow::bail!("chunking.max_chars must be > 0");
    }

    if config.indexing.workers == 0 {
        anyhow::bail!("indexing.workers must be > 0");
    }

    if config.retrieval.default_limit < 1 {
        anyhow::bail!("retrieval.default_limit must be >= 1");
    }

    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }

    if config.textsearch.extensions.is_empty() {
        anyhow::bail!("textsearch.extensions must list at least one extension");
    }

    Ok(config)
}
