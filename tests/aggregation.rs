//! End-to-end tests for the greeting route against mock upstreams.
//!
//! Each test starts a wiremock server that plays the greeting, name, and
//! tracking services, then drives the axum router with `oneshot`.
//!
//! Run with: cargo test --test aggregation

use std::collections::HashMap;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use greeter_webapp::aggregate::aggregate_with_id;
use greeter_webapp::config::{ServiceSettings, UpstreamConfig};
use greeter_webapp::upstream::UpstreamClient;
use greeter_webapp::{create_router, AppError, AppState};
use tower::ServiceExt;
use wiremock::matchers::{header as header_eq, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GREETING_PATH: &str = "/resources/greeting";
const NAME_PATH: &str = "/resources/names";
const TRACKER_PATH: &str = "/track";

/// Environment as the service would see it, with every upstream on `server`.
fn env_for(server: &MockServer) -> HashMap<String, String> {
    let addr = server.address();
    let host = addr.ip().to_string();
    let port = addr.port().to_string();
    [
        ("GREETING_SERVICE_HOST", host.clone()),
        ("GREETING_SERVICE_PORT", port.clone()),
        ("GREETING_SERVICE_PATH", GREETING_PATH.to_string()),
        ("NAME_SERVICE_HOST", host),
        ("NAME_SERVICE_PORT", port),
        ("NAME_SERVICE_PATH", NAME_PATH.to_string()),
        ("LAMBDA_TRACKER", format!("{}{}", server.uri(), TRACKER_PATH)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn settings(env: &HashMap<String, String>) -> ServiceSettings {
    ServiceSettings::from_lookup(|key| env.get(key).cloned())
}

fn upstream_config() -> UpstreamConfig {
    UpstreamConfig {
        timeout_seconds: 1,
        retry_after_seconds: 30,
    }
}

fn build_app(env: &HashMap<String, String>) -> Router {
    let state = AppState::new(&upstream_config(), settings(env)).expect("build app state");
    create_router(state)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, retry_after, String::from_utf8(body.to_vec()).unwrap())
}

async fn mount_greeting(server: &MockServer, status: u16, body: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(GREETING_PATH))
        .and(header_eq("accept", "text/plain"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_name(server: &MockServer, status: u16, body: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/resources/names/[1-8]$"))
        .and(header_eq("accept", "text/plain"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_tracker(server: &MockServer, status: u16, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(TRACKER_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_string("tracked"))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Port on localhost with nothing listening.
fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn closed_port_url() -> String {
    format!("http://127.0.0.1:{}{}", closed_port(), TRACKER_PATH)
}

#[tokio::test]
async fn test_combines_greeting_and_name() {
    let server = MockServer::start().await;
    mount_greeting(&server, 200, "Hello", 1).await;
    mount_name(&server, 200, "Alice", 1).await;
    Mock::given(method("GET"))
        .and(path(TRACKER_PATH))
        .and(query_param("username", "Alice"))
        .and(query_param("message", "Hello"))
        .respond_with(ResponseTemplate::new(200).set_body_string("tracked"))
        .expect(1)
        .mount(&server)
        .await;

    let (status, _, body) = get(build_app(&env_for(&server)), "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Hello Alice");
}

#[tokio::test]
async fn test_response_is_plain_text() {
    let server = MockServer::start().await;
    mount_greeting(&server, 200, "Hi", 1).await;
    mount_name(&server, 200, "Bob", 1).await;
    mount_tracker(&server, 200, 1).await;

    let response = build_app(&env_for(&server))
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let content_type = response.headers().get(header::CONTENT_TYPE).unwrap();
    assert!(content_type.to_str().unwrap().starts_with("text/plain"));
}

#[tokio::test]
async fn test_missing_configuration_fails_before_any_call() {
    let keys = [
        "GREETING_SERVICE_HOST",
        "GREETING_SERVICE_PORT",
        "GREETING_SERVICE_PATH",
        "NAME_SERVICE_HOST",
        "NAME_SERVICE_PORT",
        "NAME_SERVICE_PATH",
        "LAMBDA_TRACKER",
    ];

    for key in keys {
        let server = MockServer::start().await;
        let mut env = env_for(&server);
        env.remove(key);

        let (status, retry_after, body) = get(build_app(&env), "/").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "missing {}", key);
        assert_eq!(retry_after, None);
        assert!(body.contains(key), "body {:?} should name {}", body, key);
        let received = server.received_requests().await.unwrap();
        assert!(received.is_empty(), "no upstream call expected without {}", key);
    }
}

#[tokio::test]
async fn test_greeting_failure_skips_name_service() {
    let server = MockServer::start().await;
    mount_greeting(&server, 500, "boom", 1).await;
    mount_name(&server, 200, "Alice", 0).await;
    mount_tracker(&server, 200, 0).await;

    let (status, retry_after, body) = get(build_app(&env_for(&server)), "/").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(retry_after.as_deref(), Some("30"));
    assert_eq!(body, "Greeting service not available");
}

#[tokio::test]
async fn test_name_failure_discards_greeting() {
    let server = MockServer::start().await;
    mount_greeting(&server, 200, "Hello", 1).await;
    mount_name(&server, 404, "missing", 1).await;
    mount_tracker(&server, 200, 0).await;

    let (status, retry_after, body) = get(build_app(&env_for(&server)), "/").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(retry_after.as_deref(), Some("30"));
    assert_eq!(body, "Name service not available");
}

#[tokio::test]
async fn test_name_connection_failure_after_greeting() {
    let server = MockServer::start().await;
    mount_greeting(&server, 200, "Hello", 1).await;
    mount_tracker(&server, 200, 0).await;
    let mut env = env_for(&server);
    env.insert("NAME_SERVICE_HOST".to_string(), "127.0.0.1".to_string());
    env.insert("NAME_SERVICE_PORT".to_string(), closed_port().to_string());

    let (status, retry_after, body) = get(build_app(&env), "/").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(retry_after.as_deref(), Some("30"));
    assert_eq!(body, "Name service not available");
}

#[tokio::test]
async fn test_tracking_error_status_is_ignored() {
    let server = MockServer::start().await;
    mount_greeting(&server, 200, "Hello", 1).await;
    mount_name(&server, 200, "Alice", 1).await;
    mount_tracker(&server, 502, 1).await;

    let (status, _, body) = get(build_app(&env_for(&server)), "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Hello Alice");
}

#[tokio::test]
async fn test_tracking_connection_failure_is_fatal() {
    let server = MockServer::start().await;
    mount_greeting(&server, 200, "Hello", 1).await;
    mount_name(&server, 200, "Alice", 1).await;
    let mut env = env_for(&server);
    env.insert("LAMBDA_TRACKER".to_string(), closed_port_url());

    let (status, retry_after, body) = get(build_app(&env), "/").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(retry_after.as_deref(), Some("30"));
    assert_eq!(body, "Tracking service not available");
}

#[tokio::test]
async fn test_slow_greeting_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(GREETING_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("Hello")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    mount_name(&server, 200, "Alice", 0).await;

    let (status, _, body) = get(build_app(&env_for(&server)), "/").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "Greeting service not available");
}

#[tokio::test]
async fn test_scheme_override_beats_forwarded_proto() {
    let server = MockServer::start().await;
    mount_greeting(&server, 200, "Hello", 1).await;
    mount_name(&server, 200, "Alice", 1).await;
    mount_tracker(&server, 200, 1).await;
    let mut env = env_for(&server);
    env.insert("GREETING_SERVICE_SCHEME".to_string(), "http".to_string());
    env.insert("NAME_SERVICE_SCHEME".to_string(), "http".to_string());

    // Without the overrides the upstream calls would use https against a plain HTTP mock
    let response = build_app(&env)
        .oneshot(
            Request::builder()
                .uri("/")
                .header("x-forwarded-proto", "https")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_forwarded_proto_is_used_without_override() {
    let server = MockServer::start().await;
    mount_greeting(&server, 200, "Hello", 0).await;

    let response = build_app(&env_for(&server))
        .oneshot(
            Request::builder()
                .uri("/")
                .header("x-forwarded-proto", "https")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // TLS handshake against the plain HTTP mock fails at the transport level
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_name_ids_spread_over_one_to_eight() {
    let server = MockServer::start().await;
    mount_greeting(&server, 200, "Hello", 200).await;
    mount_name(&server, 200, "Alice", 200).await;
    mount_tracker(&server, 200, 200).await;
    let app = build_app(&env_for(&server));

    for _ in 0..200 {
        let (status, _, _) = get(app.clone(), "/").await;
        assert_eq!(status, StatusCode::OK);
    }

    let mut ids = std::collections::BTreeSet::new();
    for request in server.received_requests().await.unwrap() {
        if let Some(id) = request.url.path().strip_prefix("/resources/names/") {
            let id: u8 = id.parse().unwrap();
            assert!((1..=8).contains(&id));
            ids.insert(id);
        }
    }
    assert!(ids.len() > 1, "name IDs should vary across requests");
}

#[tokio::test]
async fn test_pinned_name_id_and_upstream_status() {
    let server = MockServer::start().await;
    mount_greeting(&server, 200, "Hello", 1).await;
    Mock::given(method("GET"))
        .and(path("/resources/names/5"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let env = env_for(&server);
    let client = UpstreamClient::new(&upstream_config()).unwrap();
    let err = aggregate_with_id(&settings(&env), &client, "http", 5)
        .await
        .unwrap_err();

    assert_eq!(err.service(), Some("Name"));
    assert_eq!(err.upstream_status(), Some(StatusCode::BAD_GATEWAY));
    assert!(matches!(
        err,
        AppError::UpstreamUnavailable {
            retry_after: 30,
            ..
        }
    ));
}
