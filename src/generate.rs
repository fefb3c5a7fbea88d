//! Text-generation backends.
//!
//! Each backend speaks its own wire envelope behind the common
//! [`TextGenerator`] trait:
//!
//! | Backend | Endpoint | Auth |
//! |---------|----------|------|
//! | [`GeminiProvider`] | `{base}/models/{model}:generateContent` | `key` query parameter |
//! | [`DeepSeekProvider`] | `{base}/chat/completions` | bearer token |
//! | [`OllamaGenerator`] | `{base}/api/generate` | none |
//!
//! A reply only counts as a success when the status is 2xx, the body
//! decodes, carries no error payload and yields non-empty text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{EmbeddingConfig, GenerationConfig};
use crate::error::{Error, Result};

#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// `false` when a required credential is missing; such providers are
    /// skipped by the fallback chain without a request being made.
    fn is_configured(&self) -> bool {
        true
    }

    async fn generate(&self, prompt: &str) -> Result<String>;
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Error::Configuration(format!("http client: {}", e)))
}

/// Read an API key from the environment; blank values count as missing.
fn key_from_env(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: String,
}

async fn check_status(service: &'static str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::backend(service, format!("API error {}: {}", status, body)))
}

fn non_empty(service: &'static str, text: Option<String>) -> Result<String> {
    match text {
        Some(t) if !t.trim().is_empty() => Ok(t),
        _ => Err(Error::backend(service, "empty answer")),
    }
}

// ============ Gemini ============

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContentOut<'a>>,
}

#[derive(Serialize)]
struct GeminiContentOut<'a> {
    parts: Vec<GeminiPartOut<'a>>,
}

#[derive(Serialize)]
struct GeminiPartOut<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    error: Option<ErrorPayload>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentIn>,
}

#[derive(Deserialize)]
struct GeminiContentIn {
    #[serde(default)]
    parts: Vec<GeminiPartIn>,
}

#[derive(Deserialize)]
struct GeminiPartIn {
    #[serde(default)]
    text: String,
}

pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiProvider {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        Self::new(
            &config.gemini_url,
            &config.gemini_model,
            key_from_env(&config.gemini_key_env),
            config.timeout_secs,
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Configuration("Gemini API key not set".to_string()))?;

        let body = GeminiRequest {
            contents: vec![GeminiContentOut {
                parts: vec![GeminiPartOut { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::backend("gemini", e.to_string()))?;

        let parsed: GeminiResponse = check_status("gemini", response)
            .await?
            .json()
            .await
            .map_err(|e| Error::backend("gemini", format!("invalid response: {}", e)))?;

        if let Some(err) = parsed.error {
            return Err(Error::backend("gemini", err.message));
        }

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text);

        non_empty("gemini", text)
    }
}

// ============ DeepSeek ============

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessageOut<'a>>,
}

#[derive(Serialize)]
struct ChatMessageOut<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    error: Option<ErrorPayload>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageIn,
}

#[derive(Deserialize)]
struct ChatMessageIn {
    #[serde(default)]
    content: Option<String>,
}

pub struct DeepSeekProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl DeepSeekProvider {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        Self::new(
            &config.deepseek_url,
            &config.deepseek_model,
            key_from_env(&config.deepseek_key_env),
            config.timeout_secs,
        )
    }
}

#[async_trait]
impl TextGenerator for DeepSeekProvider {
    fn name(&self) -> &str {
        "deepseek"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Configuration("DeepSeek API key not set".to_string()))?;

        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessageOut {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::backend("deepseek", e.to_string()))?;

        let parsed: ChatResponse = check_status("deepseek", response)
            .await?
            .json()
            .await
            .map_err(|e| Error::backend("deepseek", format!("invalid response: {}", e)))?;

        if let Some(err) = parsed.error {
            return Err(Error::backend("deepseek", err.message));
        }

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content);

        non_empty("deepseek", text)
    }
}

// ============ Ollama ============

#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn from_config(config: &GenerationConfig, embedding: &EmbeddingConfig) -> Result<Self> {
        Self::new(
            config.ollama_url(embedding),
            &config.ollama_model,
            config.timeout_secs,
        )
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::backend("ollama", e.to_string()))?;

        let parsed: OllamaGenerateResponse = check_status("ollama", response)
            .await?
            .json()
            .await
            .map_err(|e| Error::backend("ollama", format!("invalid response: {}", e)))?;

        if let Some(err) = parsed.error {
            return Err(Error::backend("ollama", err));
        }

        non_empty("ollama", parsed.response)
    }
}
