use axum::Router;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::get;
use metrics_agent::domain::errors::CollectError;
use metrics_agent::domain::ports::MetricSource;
use metrics_agent::infrastructure::HttpClientFactory;
use metrics_agent::infrastructure::sources::HttpSource;
use reqwest::header::{HeaderName, HeaderValue};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Span;

const TEST_METRICS: &str =
    "# test metric1\nmeteric_1_total 1\n# test metric2\nmetric_2_total 2";

async fn spawn_server() -> SocketAddr {
    let app = Router::new()
        .route(
            "/metrics",
            get(|| async { ([(header::CONTENT_TYPE, "text/plain")], TEST_METRICS) }),
        )
        .route(
            "/metrics/versioned",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
                    TEST_METRICS,
                )
            }),
        )
        .route(
            "/v2/status",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "application/json")],
                    r#"{"test-metric-1":1,"test-metric-2":2}"#,
                )
            }),
        )
        .route(
            "/v2/broken",
            get(|| async { ([(header::CONTENT_TYPE, "application/json")], "{\"a\": ") }),
        )
        .route(
            "/html",
            get(|| async { ([(header::CONTENT_TYPE, "text/html")], "<p>hi</p>") }),
        )
        .route(
            "/unavailable",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        )
        .route(
            "/private",
            get(|headers: HeaderMap| async move {
                let authorized = headers
                    .get("test-api-key")
                    .is_some_and(|v| v.as_bytes() == b"api-key");
                let status = if authorized {
                    StatusCode::OK
                } else {
                    StatusCode::UNAUTHORIZED
                };
                (status, [(header::CONTENT_TYPE, "application/json")], r#"{"peers":7}"#)
            }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                ([(header::CONTENT_TYPE, "text/plain")], "late 1\n")
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn source(addr: SocketAddr, path: &str) -> HttpSource {
    source_with(addr, path, reqwest::header::HeaderMap::new(), None)
}

fn source_with(
    addr: SocketAddr,
    path: &str,
    headers: reqwest::header::HeaderMap,
    timeout: Option<Duration>,
) -> HttpSource {
    HttpSource::new(
        &format!("http://{}{}", addr, path),
        headers,
        HttpClientFactory::create_client(timeout).unwrap(),
        Span::none(),
    )
}

fn text(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap()
}

#[tokio::test]
async fn test_fetch_text_metrics_passthrough() {
    let addr = spawn_server().await;

    let sample = source(addr, "/metrics").collect().await.unwrap();
    assert_eq!(text(sample.into_bytes()), TEST_METRICS);
}

#[tokio::test]
async fn test_text_content_type_parameters_are_ignored() {
    let addr = spawn_server().await;

    let sample = source(addr, "/metrics/versioned").collect().await.unwrap();
    assert_eq!(text(sample.into_bytes()), TEST_METRICS);
}

#[tokio::test]
async fn test_fetch_json_status() {
    let addr = spawn_server().await;
    let status = source(addr, "/v2/status");

    let sample = status.collect().await.unwrap();
    assert_eq!(
        text(sample.into_bytes()),
        "# HELP test_metric_1 test metric 1\n# TYPE test_metric_1 gauge\ntest_metric_1 1\n\
         # HELP test_metric_2 test metric 2\n# TYPE test_metric_2 gauge\ntest_metric_2 2\n"
    );

    status.collect().await.unwrap();
    assert_eq!(status.instrument_count(), 2);
}

#[tokio::test]
async fn test_malformed_json_is_not_an_error() {
    let addr = spawn_server().await;

    let sample = source(addr, "/v2/broken").collect().await.unwrap();
    assert!(sample.is_empty());
}

#[tokio::test]
async fn test_unsupported_content_type_yields_nothing() {
    let addr = spawn_server().await;

    let sample = source(addr, "/html").collect().await.unwrap();
    assert!(sample.is_empty());
}

#[tokio::test]
async fn test_non_200_status_is_an_error() {
    let addr = spawn_server().await;

    let err = source(addr, "/unavailable").collect().await.unwrap_err();
    match err {
        CollectError::Status { status, .. } => {
            assert_eq!(status, reqwest::StatusCode::SERVICE_UNAVAILABLE)
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_static_headers_are_sent() {
    let addr = spawn_server().await;

    let err = source(addr, "/private").collect().await.unwrap_err();
    assert!(matches!(err, CollectError::Status { .. }));

    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        HeaderName::from_static("test-api-key"),
        HeaderValue::from_static("api-key"),
    );
    let sample = source_with(addr, "/private", headers, None)
        .collect()
        .await
        .unwrap();
    assert!(text(sample.into_bytes()).contains("peers 7\n"));
}

#[tokio::test]
async fn test_connection_failure_is_an_error() {
    // Bind and drop to get a port nobody is listening on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = source(addr, "/metrics").collect().await.unwrap_err();
    assert!(matches!(err, CollectError::Request { .. }));
}

#[tokio::test]
async fn test_configured_timeout_fails_the_cycle() {
    let addr = spawn_server().await;

    let slow = source_with(
        addr,
        "/slow",
        reqwest::header::HeaderMap::new(),
        Some(Duration::from_millis(200)),
    );
    let err = slow.collect().await.unwrap_err();
    assert!(matches!(err, CollectError::Request { .. }));
}
