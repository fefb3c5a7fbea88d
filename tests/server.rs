//! HTTP API tests against a server on an ephemeral port.

mod common;

use std::net::SocketAddr;

use serde_json::{json, Value};

use common::{chain, test_context, FakeEmbedder, Scripted, TestContext};
use shop_rag::fallback::FallbackChain;
use shop_rag::server::router;

async fn spawn(t: &TestContext) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let app = router(t.ctx.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn doc_of_words(word: &str, count: usize) -> String {
    std::iter::repeat(word).take(count).collect::<Vec<_>>().join(" ")
}

#[tokio::test]
async fn test_health_reports_total_records() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("doc1.md"), doc_of_words("abcdefg", 150)).unwrap();
    let t = test_context(dir.path(), 2, FakeEmbedder::new(), FallbackChain::empty(), FallbackChain::empty());
    let base = spawn(&t).await;
    let client = reqwest::Client::new();

    let body: Value = client.get(format!("{}/health", base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["total_records"], 0);

    let resp = client
        .post(format!("{}/build-doc", base))
        .json(&json!({"shopid": "shop1", "filename": "doc1.md"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let built: Value = resp.json().await.unwrap();
    assert_eq!(built["persisted"], 3);
    assert_eq!(built["total"], 3);
    assert!(built.get("error").is_none());

    let body: Value = client.get(format!("{}/health", base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["total_records"], 3);
}

#[tokio::test]
async fn test_search_empty_query_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let t = test_context(dir.path(), 1, FakeEmbedder::new(), FallbackChain::empty(), FallbackChain::empty());
    let base = spawn(&t).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/search", base))
        .json(&json!({"query": "", "tenant_id": "shop1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_search_returns_answer() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("doc1.md"), doc_of_words("abcdefg", 20)).unwrap();
    let summarizer = Scripted::ok("gemini", "synthesized");
    let t = test_context(
        dir.path(),
        1,
        FakeEmbedder::new(),
        chain(vec![summarizer]),
        FallbackChain::empty(),
    );
    let base = spawn(&t).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/build-doc", base))
        .json(&json!({"tenant_id": "shop1", "filename": "doc1.md"}))
        .send()
        .await
        .unwrap();

    let body: Value = client
        .post(format!("{}/search", base))
        .json(&json!({"query": "abcdefg", "tenant_id": "shop1", "limit": 3}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 1);
    assert_eq!(body["results"][0]["source_document"], "doc1.md");
    assert_eq!(body["synthesized_answer"], "synthesized");
}

#[tokio::test]
async fn test_build_doc_missing_file_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let t = test_context(dir.path(), 1, FakeEmbedder::new(), FallbackChain::empty(), FallbackChain::empty());
    let base = spawn(&t).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/build-doc", base))
        .json(&json!({"tenant_id": "shop1", "filename": "nope.md"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_build_doc_partial_content() {
    let dir = tempfile::tempdir().unwrap();
    let mut text = doc_of_words("abcdefg", 50);
    text.push(' ');
    text.push_str(&doc_of_words("FAILxyz", 50));
    std::fs::write(dir.path().join("doc1.md"), text).unwrap();
    let t = test_context(dir.path(), 2, FakeEmbedder::new(), FallbackChain::empty(), FallbackChain::empty());
    let base = spawn(&t).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/build-doc", base))
        .json(&json!({"tenant_id": "shop1", "filename": "doc1.md", "updated_by": "alice"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 206);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["persisted"], 1);
    assert_eq!(body["total"], 2);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_clean_shop_and_stats() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.md"), "red tile").unwrap();
    std::fs::write(dir.path().join("b.md"), "blue tile").unwrap();
    let t = test_context(dir.path(), 1, FakeEmbedder::new(), FallbackChain::empty(), FallbackChain::empty());
    let base = spawn(&t).await;
    let client = reqwest::Client::new();

    for (tenant, file) in [("shop1", "a.md"), ("shop1", "b.md"), ("shop2", "a.md")] {
        let resp = client
            .post(format!("{}/build-doc", base))
            .json(&json!({"tenant_id": tenant, "filename": file}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    let stats: Value = client.get(format!("{}/stats", base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["by_tenant"][0]["tenant_id"], "shop1");
    assert_eq!(stats["by_tenant"][0]["count"], 2);

    let cleaned: Value = client
        .post(format!("{}/clean-shop", base))
        .json(&json!({"tenant_id": "shop1"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cleaned["deleted"], 2);

    let stats: Value = client.get(format!("{}/stats", base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(stats["total"], 1);
}

#[tokio::test]
async fn test_undecodable_bodies_are_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let t = test_context(dir.path(), 1, FakeEmbedder::new(), FallbackChain::empty(), FallbackChain::empty());
    let base = spawn(&t).await;
    let client = reqwest::Client::new();

    let missing_field = client
        .post(format!("{}/search", base))
        .json(&json!({"tenant_id": "shop1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(missing_field.status(), 400);
    let body: Value = missing_field.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
    assert!(body["error"]["message"].as_str().unwrap().contains("query"));

    let not_json = client
        .post(format!("{}/build-doc", base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(not_json.status(), 400);
    let body: Value = not_json.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    let no_content_type = client
        .post(format!("{}/clean-shop", base))
        .body(r#"{"tenant_id": "shop1"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(no_content_type.status(), 400);
    let body: Value = no_content_type.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}
