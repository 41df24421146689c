//! Integration tests for RekorClient.
//!
//! Uses wiremock for HTTP mocking. Tests cover index search, entry
//! retrieval, status mapping (404/429/5xx) and retry behavior.

use std::time::Duration;

use scorecard_verify::{RekorClient, TransparencyLog, VerifierConfig, VerifyError, USER_AGENT};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FIXTURE_UUID: &str =
    "24296fb24b8ad77a5f6a50efe38485dfc23540211ee89b7ff75cfef3653fd7299a6e31e3997f9463";

fn create_test_client(mock_server: &MockServer, max_retries: u32) -> RekorClient {
    let config = VerifierConfig::default()
        .with_rekor_url(mock_server.uri())
        .with_max_retries(max_retries);
    RekorClient::new(&config).expect("failed to create client")
}

#[tokio::test]
async fn test_search_by_payload_digest() {
    let mock_server = MockServer::start().await;
    let payload = include_bytes!("fixtures/results.sarif");

    Mock::given(method("POST"))
        .and(path("/api/v1/index/retrieve"))
        .and(body_json(serde_json::json!({
            "hash": "sha256:ce01c2931f564c09ddc834a7d5ba8a05314dcce03c32b3aca92c204f2c6b5c53"
        })))
        .and(header("user-agent", USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([FIXTURE_UUID])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server, 0);
    let uuids = client
        .find_entry_uuids_by_payload(payload)
        .await
        .expect("search failed");

    assert_eq!(uuids, vec![FIXTURE_UUID.to_string()]);
}

#[tokio::test]
async fn test_search_empty_result() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/index/retrieve"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server, 0);
    let uuids = client.find_entry_uuids_by_payload(b"unknown").await.unwrap();
    assert!(uuids.is_empty());
}

#[tokio::test]
async fn test_search_not_found_is_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/index/retrieve"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server, 0);
    let uuids = client.find_entry_uuids_by_payload(b"unknown").await.unwrap();
    assert!(uuids.is_empty());
}

#[tokio::test]
async fn test_get_entry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/api/v1/log/entries/{}", FIXTURE_UUID)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(include_str!("fixtures/rekor_entry.json"))
                .insert_header("content-type", "application/json"),
        )
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server, 0);
    let entry = client.get_entry(FIXTURE_UUID).await.expect("get failed");

    assert_eq!(entry.uuid, FIXTURE_UUID);
    assert_eq!(entry.log_index, 1492843);
    assert_eq!(entry.integrated_time, 1646157823);
    assert!(entry.decode().is_ok());
}

#[tokio::test]
async fn test_get_entry_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/log/entries/deadbeef"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server, 0);
    let err = client.get_entry("deadbeef").await.unwrap_err();

    match err {
        VerifyError::EntryNotFound { query } => assert_eq!(query, "uuid deadbeef"),
        other => panic!("expected EntryNotFound, got {other}"),
    }
}

#[tokio::test]
async fn test_get_entry_empty_map() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/log/entries/deadbeef"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server, 0);
    let err = client.get_entry("deadbeef").await.unwrap_err();
    assert!(matches!(err, VerifyError::InvalidResponse { .. }), "{err}");
}

#[tokio::test]
async fn test_get_entry_garbage_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/log/entries/deadbeef"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server, 0);
    let err = client.get_entry("deadbeef").await.unwrap_err();
    assert!(matches!(err, VerifyError::InvalidResponse { .. }), "{err}");
    assert_eq!(err.status_code(), 502);
}

#[tokio::test]
async fn test_rate_limiting_with_retry_after() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/index/retrieve"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "5"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server, 0);
    let result = client.find_entry_uuids_by_payload(b"payload").await;

    match result {
        Err(VerifyError::RateLimited {
            service,
            retry_after,
        }) => {
            assert_eq!(service, "rekor");
            assert_eq!(retry_after, Some(Duration::from_secs(5)));
        }
        other => panic!("expected RateLimited error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_retried_then_succeeds() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/index/retrieve"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/index/retrieve"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([FIXTURE_UUID])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server, 1);
    let uuids = client.find_entry_uuids_by_payload(b"payload").await.unwrap();
    assert_eq!(uuids.len(), 1);
}

#[tokio::test]
async fn test_max_retries_exceeded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/log/entries/deadbeef"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server, 1);
    let err = client.get_entry("deadbeef").await.unwrap_err();

    assert!(matches!(err, VerifyError::Network { .. }), "{err}");
    assert!(err.is_retryable());
}
