//! Shared fixtures for the integration tests: a deterministic embedder,
//! scripted text generators and an in-memory application context.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use shop_rag::config::{parse_config, Config};
use shop_rag::context::AppContext;
use shop_rag::embedding::Embedder;
use shop_rag::error::{Error, Result};
use shop_rag::fallback::FallbackChain;
use shop_rag::generate::TextGenerator;
use shop_rag::store::memory::InMemoryStore;
use shop_rag::tokenize::Tokenizer;

/// Texts containing this marker fail to embed.
pub const FAIL_MARKER: &str = "FAIL";

/// Embeds known texts to fixed vectors and everything else to a letter
/// histogram, so results are deterministic.
pub struct FakeEmbedder {
    fixed: HashMap<String, Vec<f32>>,
    dims: usize,
    pub calls: AtomicUsize,
}

impl FakeEmbedder {
    /// Letter histograms: 26 dimensions.
    pub fn new() -> Self {
        Self::with_dims(26)
    }

    /// Declares `dims`; use with [`FakeEmbedder::with`] vectors of that length.
    pub fn with_dims(dims: usize) -> Self {
        Self {
            fixed: HashMap::new(),
            dims,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.fixed.insert(text.to_string(), vector);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn model_name(&self) -> &str {
        "fake"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains(FAIL_MARKER) {
            return Err(Error::backend("embedding", "scripted failure"));
        }
        if let Some(v) = self.fixed.get(text) {
            return Ok(v.clone());
        }
        let mut v = vec![0.0f32; 26];
        for c in text.to_ascii_lowercase().bytes() {
            if c.is_ascii_lowercase() {
                v[(c - b'a') as usize] += 1.0;
            }
        }
        Ok(v)
    }
}

/// A text generator that returns a fixed answer, or fails.
pub struct Scripted {
    name: &'static str,
    answer: Option<String>,
    pub calls: AtomicUsize,
    pub prompts: std::sync::Mutex<Vec<String>>,
}

impl Scripted {
    pub fn ok(name: &'static str, answer: &str) -> Arc<Self> {
        Arc::new(Self {
            name,
            answer: Some(answer.to_string()),
            calls: AtomicUsize::new(0),
            prompts: std::sync::Mutex::new(Vec::new()),
        })
    }

    pub fn failing(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            answer: None,
            calls: AtomicUsize::new(0),
            prompts: std::sync::Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.answer {
            Some(a) => Ok(a.clone()),
            None => Err(Error::backend("scripted", "status 503")),
        }
    }
}

pub fn chain(providers: Vec<Arc<Scripted>>) -> FallbackChain {
    FallbackChain::new(
        providers
            .into_iter()
            .map(|p| p as Arc<dyn TextGenerator>)
            .collect(),
    )
}

/// Config pointing every directory at `root` and every backend at an
/// address nothing listens on.
pub fn test_config(root: &Path, workers: usize) -> Config {
    let content = format!(
        r#"
[db]
url = "postgres://unused@127.0.0.1:1/unused"

[indexing]
workers = {workers}

[embedding]
url = "http://127.0.0.1:1"
timeout_secs = 2

[generation]
gemini_key_env = "SHOPRAG_TEST_UNSET_GEMINI_KEY"
deepseek_key_env = "SHOPRAG_TEST_UNSET_DEEPSEEK_KEY"
timeout_secs = 2

[textsearch]
root = "{root}"

[server]
bind = "127.0.0.1:0"
docs_root = "{root}"
"#,
        workers = workers,
        root = root.display()
    );
    parse_config(&content).unwrap()
}

pub struct TestContext {
    pub ctx: Arc<AppContext>,
    pub store: Arc<InMemoryStore>,
    pub embedder: Arc<FakeEmbedder>,
}

pub fn test_context(
    root: &Path,
    workers: usize,
    embedder: FakeEmbedder,
    summarizers: FallbackChain,
    expanders: FallbackChain,
) -> TestContext {
    let store = Arc::new(InMemoryStore::new());
    let embedder = Arc::new(embedder);
    let ctx = AppContext {
        config: test_config(root, workers),
        store: store.clone(),
        embedder: embedder.clone(),
        summarizers,
        expanders,
        tokenizer: Tokenizer::rule_based(),
    };
    TestContext {
        ctx: Arc::new(ctx),
        store,
        embedder,
    }
}
