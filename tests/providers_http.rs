//! HTTP-level provider tests against a local mock server

use ragcore::infrastructure::completion::OpenAiCompletionProvider;
use ragcore::infrastructure::embedding::OpenAiEmbeddingProvider;
use ragcore::infrastructure::HttpClient;
use ragcore::{CompletionOptions, CompletionProvider, EmbeddingProvider};

use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn embeddings_body(count: usize, dimension: usize) -> serde_json::Value {
    let data: Vec<serde_json::Value> = (0..count)
        .map(|i| {
            let embedding: Vec<f32> = (0..dimension).map(|j| (i + j) as f32 * 0.01).collect();
            serde_json::json!({ "index": i, "embedding": embedding })
        })
        .collect();

    serde_json::json!({ "model": "text-embedding-3-small", "data": data })
}

#[tokio::test]
async fn embedding_provider_round_trips_over_http() {
    init_tracing();

    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(embeddings_body(2, 1536)))
        .mount(&server)
        .await;

    let provider = OpenAiEmbeddingProvider::with_base_url(
        HttpClient::new(),
        "test-key",
        "text-embedding-3-small",
        server.uri(),
    );

    let vectors = provider
        .embed_many(&["first".to_string(), "second".to_string()])
        .await
        .unwrap();

    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[0].len(), 1536);
}

#[tokio::test]
async fn embedding_provider_surfaces_http_errors() {
    init_tracing();

    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let provider = OpenAiEmbeddingProvider::with_base_url(
        HttpClient::new(),
        "test-key",
        "text-embedding-3-small",
        server.uri(),
    );

    let result = provider.embed_one("text").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn completion_provider_sends_prompt_and_reads_content() {
    init_tracing();

    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "messages": [{ "role": "user", "content": "Say hello" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "Hello from the wire" },
                "finish_reason": "stop"
            }]
        })))
        .mount(&server)
        .await;

    let provider = OpenAiCompletionProvider::with_base_url(
        HttpClient::new(),
        "test-key",
        "gpt-4o-mini",
        server.uri(),
    );

    let content = provider
        .complete("Say hello", &CompletionOptions::default())
        .await
        .unwrap();

    assert_eq!(content, "Hello from the wire");
}

#[tokio::test]
async fn completion_provider_streams_sse_fragments() {
    use futures::StreamExt;

    let sse = "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n\
               data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n\
               data: [DONE]\n\n";

    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse.as_bytes().to_vec(), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let provider = OpenAiCompletionProvider::with_base_url(
        HttpClient::new(),
        "test-key",
        "gpt-4o-mini",
        server.uri(),
    );

    let mut stream = provider
        .stream("prompt", &CompletionOptions::default())
        .await
        .unwrap();

    let mut out = String::new();
    while let Some(fragment) = stream.next().await {
        out.push_str(&fragment.unwrap());
    }

    assert_eq!(out, "Hello");
}
