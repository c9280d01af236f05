use super::*;
use crate::Config;
use crate::controller::test_helpers::{
    RecordingObserver, ScriptedBackend, create_test_controller, test_config, wait_until_settled,
};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;


/// Controller over a scripted backend, wrapped for the router
fn test_controller() -> (Arc<JobController>, Arc<ScriptedBackend>) {
    let backend = ScriptedBackend::new();
    let controller = create_test_controller(backend.clone(), Arc::new(RecordingObserver::new()));
    (Arc::new(controller), backend)
}

/// Controller built from a custom config
fn controller_with(config: Config) -> Arc<JobController> {
    Arc::new(
        JobController::new(
            config,
            ScriptedBackend::new(),
            Arc::new(RecordingObserver::new()),
        )
        .unwrap(),
    )
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn api_server_spawns_on_ephemeral_port() {
    let mut config = test_config();
    config.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let controller = controller_with(config);

    let api_handle = controller.spawn_api_server();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!api_handle.is_finished(), "server should still be serving");
    api_handle.abort();
}

#[tokio::test]
async fn server_answers_health_over_tcp() {
    let (controller, _backend) = test_controller();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(controller);
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"), "got: {response}");
    assert!(response.contains("\"status\":\"ok\""));
    server.abort();
}

#[tokio::test]
async fn cors_allows_any_origin_by_default() {
    let (controller, _backend) = test_controller();
    let app = create_router(controller);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn cors_restricts_to_listed_origins() {
    let mut config = test_config();
    config.api.cors_origins = vec!["http://allowed.example".to_string()];
    let app = create_router(controller_with(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://other.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn cors_disabled_adds_no_headers() {
    let mut config = test_config();
    config.api.cors_enabled = false;
    let app = create_router(controller_with(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}
