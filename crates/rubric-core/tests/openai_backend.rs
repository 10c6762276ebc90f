//! OpenAI-compatible backends against a mock HTTP server.

use std::sync::Arc;
use std::time::Duration;

use rubric_core::{
    Embedder, EmbeddingSimilarity, GenerationBackend, GenerationRequest, OpenAiBackend,
    OpenAiConfig, OpenAiEmbeddings, SimilarityBackend, TestCase,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> OpenAiConfig {
    OpenAiConfig {
        base_url: server.uri(),
        api_key: Some("test-key".to_string()),
        timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn test_chat_completion_returns_text_and_usage() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "test-gen",
            "max_tokens": 512,
            "messages": [
                { "role": "system", "content": "You are a helpful assistant." },
                { "role": "user", "content": "What is the capital of France?" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": "Paris" }, "finish_reason": "stop" }
            ],
            "usage": { "prompt_tokens": 21, "completion_tokens": 1, "total_tokens": 22 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = OpenAiBackend::new(config(&server)).unwrap();
    let request = GenerationRequest::from_test_case("test-gen", &TestCase::new("What is the capital of France?"));
    let generation = backend.generate(&request).await.unwrap();

    assert_eq!(generation.text, "Paris");
    assert_eq!(generation.prompt_tokens, 21);
    assert_eq!(generation.completion_tokens, 1);
}

#[tokio::test]
async fn test_chat_error_status_surfaces_provider_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "message": "Rate limit reached", "type": "rate_limit_error" }
        })))
        .mount(&server)
        .await;

    let backend = OpenAiBackend::new(config(&server)).unwrap();
    let request = GenerationRequest::from_test_case("test-gen", &TestCase::new("hi"));
    let err = backend.generate(&request).await.unwrap_err();

    let message = format!("{err:#}");
    assert!(message.contains("429"));
    assert!(message.contains("Rate limit reached"));
}

#[tokio::test]
async fn test_embeddings_feed_cosine_similarity() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(body_partial_json(json!({ "model": "test-embed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [ { "embedding": [0.6, 0.8, 0.0], "index": 0 } ],
            "model": "test-embed",
            "usage": { "prompt_tokens": 2, "total_tokens": 2 }
        })))
        .expect(3)
        .mount(&server)
        .await;

    let embeddings = OpenAiEmbeddings::new(config(&server), "test-embed").unwrap();
    let vector = embeddings.embed("sample").await.unwrap();
    assert_eq!(vector, vec![0.6, 0.8, 0.0]);

    let similarity = EmbeddingSimilarity::new(Arc::new(embeddings));
    let value = similarity.similarity("a cat", "a feline").await.unwrap();
    assert!((value - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_embeddings_failure_is_similarity_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let embeddings = OpenAiEmbeddings::new(config(&server), "test-embed").unwrap();
    let similarity = EmbeddingSimilarity::new(Arc::new(embeddings));
    let err = similarity.similarity("a", "b").await.unwrap_err();
    assert!(matches!(err, rubric_core::EvalError::Similarity(ref m) if m.contains("HTTP 500: upstream exploded")));
}

#[tokio::test]
async fn test_plain_text_error_body_is_kept() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad gateway: model server restarting\n"))
        .mount(&server)
        .await;

    let backend = OpenAiBackend::new(config(&server)).unwrap();
    let request = GenerationRequest::from_test_case("test-gen", &TestCase::new("hi"));
    let err = backend.generate(&request).await.unwrap_err();

    assert!(format!("{err:#}").contains("HTTP 502: Bad gateway: model server restarting"));
}
