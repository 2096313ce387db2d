//! API router tests against an in-process harvester with scripted doubles.

use crate::api::create_router;
use crate::config::Config;
use crate::db::Database;
use crate::harvester::VideoHarvester;
use crate::harvester::test_helpers::{MockSink, MockSource, relevant_video, test_config};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt;

struct TestApp {
    router: Router,
    harvester: Arc<VideoHarvester>,
    _dir: TempDir,
}

async fn test_app(source: Arc<MockSource>, sink: Arc<MockSink>) -> TestApp {
    test_app_with(source, sink, |_| {}).await
}

async fn test_app_with(
    source: Arc<MockSource>,
    sink: Arc<MockSink>,
    tweak: impl FnOnce(&mut Config),
) -> TestApp {
    let dir = tempfile::tempdir().expect("create temp dir");
    let mut config = test_config(&dir);
    tweak(&mut config);

    let db = Arc::new(
        Database::new(&config.persistence.database_path)
            .await
            .expect("create test database"),
    );
    let harvester = Arc::new(
        VideoHarvester::with_components(config, db, source, sink).expect("build harvester"),
    );
    let router = create_router(harvester.clone(), harvester.get_config());

    TestApp {
        router,
        harvester,
        _dir: dir,
    }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse body json")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn health_returns_ok_and_version() {
    let app = test_app(Arc::new(MockSource::new()), Arc::new(MockSink::new())).await;

    let response = app.router.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn status_reports_idle_with_credential_summary() {
    let app = test_app(Arc::new(MockSource::new()), Arc::new(MockSink::new())).await;

    let response = app
        .router
        .clone()
        .oneshot(get("/extraction/status"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["state"], "idle");
    assert_eq!(json["credentials"]["total"], 2);
    assert!(json.get("session").is_none());
}

#[tokio::test]
async fn single_run_is_accepted_and_produces_a_session() {
    let source = Arc::new(
        MockSource::new().with_results("colombo", vec![relevant_video("vid-1")]),
    );
    let app = test_app(source, Arc::new(MockSink::new())).await;

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/extraction/run",
            serde_json::json!({"query": "colombo"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let json = body_json(response).await;
    assert_eq!(json["status"], "started");
    let session_id = json["session_id"].as_str().unwrap().to_string();

    app.harvester.wait_until_idle().await;

    let response = app
        .router
        .clone()
        .oneshot(get(&format!("/extraction/sessions/{}", session_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "completed");
    assert_eq!(json["items_extracted"], 1);
}

#[tokio::test]
async fn concurrent_start_is_rejected_with_409() {
    let source = Arc::new(
        MockSource::new()
            .with_results("colombo", vec![relevant_video("vid-1")])
            .with_delay(Duration::from_millis(300)),
    );
    let app = test_app(source, Arc::new(MockSink::new())).await;

    let first = app
        .router
        .clone()
        .oneshot(post_json(
            "/extraction/run",
            serde_json::json!({"query": "colombo"}),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::ACCEPTED);

    let second = app
        .router
        .clone()
        .oneshot(post_empty("/extraction/comprehensive"))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let json = body_json(second).await;
    assert_eq!(json["error"]["code"], "already_running");

    app.harvester.stop_run().await.ok();
    app.harvester.wait_until_idle().await;
}

#[tokio::test]
async fn stop_without_active_run_returns_409() {
    let app = test_app(Arc::new(MockSource::new()), Arc::new(MockSink::new())).await;

    let response = app
        .router
        .clone()
        .oneshot(post_empty("/extraction/stop"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "no_active_run");
}

#[tokio::test]
async fn targeted_run_with_empty_query_list_returns_400() {
    let app = test_app(Arc::new(MockSource::new()), Arc::new(MockSink::new())).await;

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/extraction/targeted",
            serde_json::json!({"queries": []}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn videos_endpoint_returns_cached_rows_after_a_run() {
    let source = Arc::new(
        MockSource::new().with_results("colombo", vec![relevant_video("vid-1")]),
    );
    let app = test_app(source, Arc::new(MockSink::new())).await;

    app.router
        .clone()
        .oneshot(post_json(
            "/extraction/run",
            serde_json::json!({"query": "colombo"}),
        ))
        .await
        .unwrap();
    app.harvester.wait_until_idle().await;

    let response = app
        .router
        .clone()
        .oneshot(get("/videos?relevant_only=true&limit=10"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["video_id"], "vid-1");
    assert_eq!(rows[0]["is_relevant"], true);
}

#[tokio::test]
async fn credentials_endpoint_exposes_hashes_not_keys() {
    let app = test_app(Arc::new(MockSource::new()), Arc::new(MockSink::new())).await;

    let response = app
        .router
        .clone()
        .oneshot(get("/credentials"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(!text.contains("test-key-a"), "raw keys must never appear");

    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["total"], 2);
    assert_eq!(json["credentials"][0]["key_hash"].as_str().unwrap().len(), 16);
}

#[tokio::test]
async fn unknown_session_returns_404() {
    let app = test_app(Arc::new(MockSource::new()), Arc::new(MockSink::new())).await;

    let response = app
        .router
        .clone()
        .oneshot(get("/extraction/sessions/does-not-exist"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn openapi_spec_is_served() {
    let app = test_app(Arc::new(MockSource::new()), Arc::new(MockSink::new())).await;

    let response = app
        .router
        .clone()
        .oneshot(get("/openapi.json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["paths"]["/api/v1/extraction/run"].is_object());
}

#[tokio::test]
async fn configured_api_key_is_enforced() {
    let app = test_app_with(
        Arc::new(MockSource::new()),
        Arc::new(MockSink::new()),
        |config| {
            config.api.api_key = Some("sekrit".to_string());
        },
    )
    .await;

    // Missing header
    let response = app.router.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Wrong key
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-api-key", "wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Correct key
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-api-key", "sekrit")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
