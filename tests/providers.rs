//! HTTP backends against mock servers.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shop_rag::config::EmbeddingConfig;
use shop_rag::embedding::{Embedder, OllamaEmbedder};
use shop_rag::error::Error;
use shop_rag::fallback::FallbackChain;
use shop_rag::generate::{DeepSeekProvider, GeminiProvider, OllamaGenerator, TextGenerator};

fn embedding_config(url: &str) -> EmbeddingConfig {
    EmbeddingConfig {
        url: url.to_string(),
        model: "bge-m3".to_string(),
        dims: 3,
        timeout_secs: 5,
    }
}

#[tokio::test]
async fn test_ollama_embedder_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .and(body_partial_json(json!({"model": "bge-m3", "prompt": "roof tile"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embedding": [0.1, 0.2, 0.3]})))
        .expect(1)
        .mount(&server)
        .await;

    let embedder = OllamaEmbedder::new(&embedding_config(&server.uri())).unwrap();
    let v = embedder.embed("roof tile").await.unwrap();
    assert_eq!(v, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn test_ollama_embedder_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not found"))
        .mount(&server)
        .await;

    let embedder = OllamaEmbedder::new(&embedding_config(&server.uri())).unwrap();
    let err = embedder.embed("roof tile").await.unwrap_err();
    match err {
        Error::BackendUnavailable { service, message } => {
            assert_eq!(service, "embedding");
            assert!(message.contains("model not found"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_ollama_embedder_bad_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embedding": []})))
        .mount(&server)
        .await;

    let embedder = OllamaEmbedder::new(&embedding_config(&server.uri())).unwrap();
    assert!(matches!(
        embedder.embed("x").await,
        Err(Error::BackendUnavailable { .. })
    ));
}

#[tokio::test]
async fn test_ollama_embedder_unreachable() {
    let embedder = OllamaEmbedder::new(&embedding_config("http://127.0.0.1:1")).unwrap();
    assert!(matches!(
        embedder.embed("x").await,
        Err(Error::BackendUnavailable { .. })
    ));
}

#[tokio::test]
async fn test_gemini_generate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-pro:generateContent"))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({"contents": [{"parts": [{"text": "hello"}]}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "สวัสดี"}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gemini = GeminiProvider::new(&server.uri(), "gemini-pro", Some("test-key".into()), 5).unwrap();
    assert!(gemini.is_configured());
    assert_eq!(gemini.generate("hello").await.unwrap(), "สวัสดี");
}

#[tokio::test]
async fn test_gemini_empty_candidates_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-pro:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let gemini = GeminiProvider::new(&server.uri(), "gemini-pro", Some("k".into()), 5).unwrap();
    assert!(matches!(
        gemini.generate("hello").await,
        Err(Error::BackendUnavailable { .. })
    ));
}

#[tokio::test]
async fn test_deepseek_generate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer ds-key"))
        .and(body_partial_json(json!({
            "model": "deepseek-chat",
            "messages": [{"role": "user", "content": "hello"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "hi there"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let deepseek = DeepSeekProvider::new(&server.uri(), "deepseek-chat", Some("ds-key".into()), 5).unwrap();
    assert_eq!(deepseek.generate("hello").await.unwrap(), "hi there");
}

#[tokio::test]
async fn test_deepseek_error_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"message": "insufficient balance"}
        })))
        .mount(&server)
        .await;

    let deepseek = DeepSeekProvider::new(&server.uri(), "deepseek-chat", Some("k".into()), 5).unwrap();
    match deepseek.generate("hello").await {
        Err(Error::BackendUnavailable { message, .. }) => {
            assert!(message.contains("insufficient balance"))
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_key_is_not_configured() {
    let deepseek = DeepSeekProvider::new("http://127.0.0.1:1", "deepseek-chat", None, 5).unwrap();
    assert!(!deepseek.is_configured());
    assert!(matches!(
        deepseek.generate("hello").await,
        Err(Error::Configuration(_))
    ));
}

#[tokio::test]
async fn test_ollama_generate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({"model": "llama3", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "กระเบื้อง|tile|roof tile",
            "done": true
        })))
        .mount(&server)
        .await;

    let ollama = OllamaGenerator::new(&server.uri(), "llama3", 5).unwrap();
    assert_eq!(
        ollama.generate("expand").await.unwrap(),
        "กระเบื้อง|tile|roof tile"
    );
}

#[tokio::test]
async fn test_chain_fails_over_between_real_providers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-pro:generateContent"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "from deepseek"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let chain = FallbackChain::new(vec![
        Arc::new(GeminiProvider::new(&server.uri(), "gemini-pro", Some("g".into()), 5).unwrap())
            as Arc<dyn TextGenerator>,
        Arc::new(DeepSeekProvider::new(&server.uri(), "deepseek-chat", Some("d".into()), 5).unwrap()),
    ]);

    assert_eq!(chain.invoke("prompt").await.as_deref(), Some("from deepseek"));
}

#[tokio::test]
async fn test_chain_skips_unconfigured_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "answer"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let chain = FallbackChain::new(vec![
        Arc::new(GeminiProvider::new(&server.uri(), "gemini-pro", None, 5).unwrap())
            as Arc<dyn TextGenerator>,
        Arc::new(DeepSeekProvider::new(&server.uri(), "deepseek-chat", Some("d".into()), 5).unwrap()),
    ]);

    assert_eq!(chain.invoke("prompt").await.as_deref(), Some("answer"));
}
