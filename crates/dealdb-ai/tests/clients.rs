//! Integration tests for the extraction and embedding clients using wiremock.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use dealdb_ai::retry::is_transient;
use dealdb_ai::{AiError, EmbeddingClient, ExtractionClient, RetryPolicy};
use dealdb_core::AiSettings;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DIMENSIONS: usize = 4;

fn settings(base_url: &str) -> AiSettings {
    AiSettings {
        api_key: "test-key".to_string(),
        base_url: base_url.to_string(),
        extraction_model: "extract-model".to_string(),
        embedding_model: "embed-model".to_string(),
        embedding_dimensions: DIMENSIONS,
        max_attempts: 3,
        backoff_ms: 0,
        request_timeout_secs: 5,
    }
}

fn extraction_client(server: &MockServer) -> ExtractionClient {
    ExtractionClient::new(&settings(&server.uri()))
        .expect("client should build")
        .with_retry_policy(RetryPolicy::linear(3, Duration::ZERO))
}

fn embedding_client(server: &MockServer) -> EmbeddingClient {
    EmbeddingClient::new(&settings(&server.uri()))
        .expect("client should build")
        .with_retry_policy(RetryPolicy::linear(3, Duration::ZERO))
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content } }
        ]
    })
}

fn extracted() -> serde_json::Value {
    json!({
        "isSale": true,
        "lowQuality": false,
        "professionalSummary": "A profitable invoicing SaaS.",
        "monthlyRevenue": "$2k",
        "askingPrice": null,
        "userCount": null,
        "link": [],
        "otherImportantStuff": "Built with Rails."
    })
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

#[tokio::test]
async fn extraction_sends_strict_schema_and_parses_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "extract-model",
            "response_format": {
                "type": "json_schema",
                "json_schema": { "name": "deal_extraction", "strict": true }
            }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion(&extracted().to_string())),
        )
        .expect(1)
        .mount(&server)
        .await;

    let value = extraction_client(&server)
        .extract("Selling my SaaS", "MRR $2k")
        .await
        .expect("extraction should succeed");

    assert_eq!(value, extracted());
}

#[tokio::test]
async fn rate_limits_are_retried_until_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion(&extracted().to_string())),
        )
        .expect(1)
        .mount(&server)
        .await;

    let value = extraction_client(&server).extract("t", "b").await;

    assert_eq!(value, Some(extracted()));
}

#[tokio::test]
async fn rate_limit_on_every_attempt_gives_up_after_max_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let err = extraction_client(&server)
        .try_extract("t", "b")
        .await
        .unwrap_err();

    assert!(matches!(err, AiError::RateLimited));
}

async fn mount_server_error(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn server_error_is_returned_after_a_single_attempt() {
    let server = MockServer::start().await;
    mount_server_error(&server).await;

    let err = extraction_client(&server)
        .try_extract("t", "b")
        .await
        .unwrap_err();

    assert!(matches!(err, AiError::Status { status: 500, .. }));
}

#[tokio::test]
async fn server_error_yields_no_result_after_a_single_attempt() {
    let server = MockServer::start().await;
    mount_server_error(&server).await;

    assert!(extraction_client(&server).extract("t", "b").await.is_none());
}

/// Base URL of a loopback port with nothing listening on it.
fn unreachable_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    format!("http://127.0.0.1:{port}")
}

static TRANSPORT_FAILURES: AtomicU32 = AtomicU32::new(0);

fn count_transport_failure(err: &AiError) -> bool {
    if matches!(err, AiError::Http(_)) {
        TRANSPORT_FAILURES.fetch_add(1, Ordering::SeqCst);
    }
    is_transient(err)
}

#[tokio::test]
async fn transport_failure_is_retried_then_propagated() {
    let client = ExtractionClient::new(&settings(&unreachable_base_url()))
        .expect("client should build")
        .with_retry_policy(
            RetryPolicy::linear(3, Duration::ZERO).with_predicate(count_transport_failure),
        );

    let err = client.try_extract("t", "b").await.unwrap_err();
    assert!(matches!(err, AiError::Http(_)), "got {err:?}");
    assert_eq!(TRANSPORT_FAILURES.load(Ordering::SeqCst), 3);

    assert!(client.extract("t", "b").await.is_none());
    assert_eq!(TRANSPORT_FAILURES.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn missing_content_is_reported_as_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [ { "message": { "role": "assistant", "content": null } } ]
        })))
        .mount(&server)
        .await;

    let err = extraction_client(&server)
        .try_extract("t", "b")
        .await
        .unwrap_err();
    assert!(matches!(err, AiError::MissingContent));
}

#[tokio::test]
async fn unparseable_content_is_reported_as_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion("Sure! Here is the JSON: {")),
        )
        .mount(&server)
        .await;

    let client = extraction_client(&server);
    assert!(client.extract("t", "b").await.is_none());
    assert!(matches!(
        client.try_extract("t", "b").await.unwrap_err(),
        AiError::Deserialize { .. }
    ));
}

#[tokio::test]
async fn non_object_json_is_returned_for_validation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("[1, 2]")))
        .mount(&server)
        .await;

    let value = extraction_client(&server).extract("t", "b").await;
    assert_eq!(value, Some(json!([1, 2])));
}

// ---------------------------------------------------------------------------
// Embedding
// ---------------------------------------------------------------------------

#[tokio::test]
async fn embedding_returns_vector_of_configured_length() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(body_partial_json(json!({
            "model": "embed-model",
            "input": "Title\nSummary",
            "dimensions": DIMENSIONS
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [ { "index": 0, "embedding": [0.1, 0.2, 0.3, 0.4] } ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = embedding_client(&server);
    let vector = client.embed("Title\nSummary").await.expect("embedding");

    assert_eq!(vector.len(), client.dimensions());
    assert!((vector[2] - 0.3).abs() < f32::EPSILON);
}

#[tokio::test]
async fn embedding_with_wrong_length_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [ { "embedding": [0.1, 0.2] } ]
        })))
        .mount(&server)
        .await;

    let err = embedding_client(&server).embed("text").await.unwrap_err();
    assert!(matches!(
        err,
        AiError::DimensionMismatch {
            expected: DIMENSIONS,
            actual: 2
        }
    ));
}

#[tokio::test]
async fn embedding_with_empty_data_is_an_embedding_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let err = embedding_client(&server).embed("text").await.unwrap_err();
    assert!(matches!(err, AiError::Embedding(_)));
}
