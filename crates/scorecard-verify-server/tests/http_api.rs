//! HTTP surface tests: router driven with `tower::ServiceExt::oneshot`,
//! Rekor and GitHub mocked with wiremock.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use scorecard_verify::{Verifier, VerifierConfig};
use scorecard_verify_server::router;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAYLOAD: &[u8] = include_bytes!("../../scorecard-verify/tests/fixtures/results.sarif");
const REKOR_ENTRY: &str = include_str!("../../scorecard-verify/tests/fixtures/rekor_entry.json");
const FIXTURE_UUID: &str =
    "24296fb24b8ad77a5f6a50efe38485dfc23540211ee89b7ff75cfef3653fd7299a6e31e3997f9463";

fn app(rekor: &MockServer, github: &MockServer) -> axum::Router {
    let config = VerifierConfig::default()
        .with_rekor_url(rekor.uri())
        .with_github_api_url(github.uri())
        .with_max_retries(0);
    router(Arc::new(Verifier::from_config(config).unwrap()))
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_projects(uri: &str, body: &'static [u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_home_banner() {
    let rekor = MockServer::start().await;
    let github = MockServer::start().await;

    let response = app(&rekor, &github)
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"Scorecard signature certificate verification");
}

#[tokio::test]
async fn test_healthz() {
    let rekor = MockServer::start().await;
    let github = MockServer::start().await;

    let response = app(&rekor, &github)
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_empty_body_is_bad_request() {
    let rekor = MockServer::start().await;
    let github = MockServer::start().await;

    let response = app(&rekor, &github)
        .oneshot(post_projects("/projects/", b""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "empty_payload");
}

#[tokio::test]
async fn test_verify_project() {
    let rekor = MockServer::start().await;
    let github = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/index/retrieve"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([FIXTURE_UUID])))
        .mount(&rekor)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/log/entries/{}", FIXTURE_UUID)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(REKOR_ENTRY)
                .insert_header("content-type", "application/json"),
        )
        .mount(&rekor)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/org/project/contents/.github/workflows/scorecards.yml"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "type": "file",
            "encoding": "base64",
            "sha": "0d3f4c1b",
            "content": "bmFtZTogU2NvcmVjYXJkcw==\n"
        })))
        .mount(&github)
        .await;

    let response = app(&rekor, &github)
        .oneshot(post_projects("/projects/", PAYLOAD))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["provenance"]["reference"], "refs/heads/main");
    assert_eq!(json["provenance"]["path"], "org/project");
    assert_eq!(json["entry"]["kind"], "hashedrekord");
    assert_eq!(json["workflow"]["sha"], "0d3f4c1b");
    assert_eq!(json["policy"]["status"], "not_evaluated");
}

#[tokio::test]
async fn test_unknown_payload_is_not_found() {
    let rekor = MockServer::start().await;
    let github = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/index/retrieve"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&rekor)
        .await;

    // Trailing slash is optional.
    let response = app(&rekor, &github)
        .oneshot(post_projects("/projects", b"unsigned results"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "entry_not_found");
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("no transparency log entry found for sha256:"));
}

#[tokio::test]
async fn test_upstream_failure_is_bad_gateway() {
    let rekor = MockServer::start().await;
    let github = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&rekor)
        .await;

    let response = app(&rekor, &github)
        .oneshot(post_projects("/projects/", PAYLOAD))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "upstream_unavailable");
}

#[tokio::test]
async fn test_get_projects_not_allowed() {
    let rekor = MockServer::start().await;
    let github = MockServer::start().await;

    let response = app(&rekor, &github)
        .oneshot(Request::builder().uri("/projects/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
