// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /user_count before and after the first published cycle
// - GET /user_count after an all-failed cycle keeps the prior answer
// - GET /debug/snapshot only when enabled

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    Router,
};
use http::{Request, StatusCode};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use focus_user_count::api::{self, AppState};
use focus_user_count::cache::snapshot_cache;
use focus_user_count::config::AppConfig;
use focus_user_count::{Aggregator, CountExtractor, ExtractError, SnapshotReader, Source};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

struct Fixed(Source, Result<u64, ExtractError>);

#[async_trait]
impl CountExtractor for Fixed {
    async fn fetch_count(&self) -> Result<u64, ExtractError> {
        self.1.clone()
    }
    fn source(&self) -> Source {
        self.0
    }
}

fn app(reader: SnapshotReader, debug_routes: bool) -> Router {
    let cfg = AppConfig {
        debug_routes,
        ..AppConfig::default()
    };
    api::router(AppState::new(reader, &cfg))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET");
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, bytes)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Json) {
    let (status, bytes) = get(app, uri).await;
    let v = serde_json::from_slice(&bytes).expect("parse json");
    (status, v)
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let (_writer, reader) = snapshot_cache();
    let (status, body) = get(&app(reader, false), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap().trim(), "OK");
}

#[tokio::test]
async fn user_count_is_503_until_first_cycle() {
    let (_writer, reader) = snapshot_cache();
    let (status, v) = get_json(&app(reader, false), "/user_count").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(v, serde_json::json!({ "error": "User count not yet available" }));
}

#[tokio::test]
async fn user_count_serves_published_total() {
    let (writer, reader) = snapshot_cache();
    let agg = Aggregator::new(
        vec![
            Arc::new(Fixed(Source::Chrome, Ok(2_000))),
            Arc::new(Fixed(Source::Firefox, Err(ExtractError::Parse("gone".into())))),
            Arc::new(Fixed(Source::Edge, Ok(500))),
        ],
        writer,
        Duration::from_secs(5),
        3,
    );
    agg.run_cycle().await;

    let (status, v) = get_json(&app(reader, false), "/user_count").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v, serde_json::json!({ "userCount": 2500 }));
}

#[tokio::test]
async fn all_failed_cycle_keeps_serving_prior_count() {
    struct OnceThenDown(std::sync::atomic::AtomicBool);

    #[async_trait]
    impl CountExtractor for OnceThenDown {
        async fn fetch_count(&self) -> Result<u64, ExtractError> {
            if self.0.swap(true, std::sync::atomic::Ordering::SeqCst) {
                Err(ExtractError::Fetch("503".into()))
            } else {
                Ok(42)
            }
        }
        fn source(&self) -> Source {
            Source::Firefox
        }
    }

    let (writer, reader) = snapshot_cache();
    let agg = Aggregator::new(
        vec![Arc::new(OnceThenDown(Default::default()))],
        writer,
        Duration::from_secs(5),
        3,
    );
    let router = app(reader, false);

    agg.run_cycle().await;
    let (_, first) = get(&router, "/user_count").await;

    agg.run_cycle().await;
    let (status, second) = get(&router, "/user_count").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, second, "body must be byte-for-byte unchanged");
}

#[tokio::test]
async fn debug_snapshot_is_hidden_by_default() {
    let (_writer, reader) = snapshot_cache();
    let (status, _) = get(&app(reader, false), "/debug/snapshot").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn debug_snapshot_lists_error_kinds_only() {
    let (writer, reader) = snapshot_cache();
    let agg = Aggregator::new(
        vec![
            Arc::new(Fixed(Source::Chrome, Ok(10))),
            Arc::new(Fixed(
                Source::Edge,
                Err(ExtractError::ElementNotFound("#activeInstallText".into())),
            )),
        ],
        writer,
        Duration::from_secs(5),
        3,
    );
    agg.run_cycle().await;

    let (status, v) = get_json(&app(reader, true), "/debug/snapshot").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["totalCount"], 10);
    assert!(v["computedAt"].is_string());
    assert_eq!(v["sources"][0]["source"], "chrome");
    assert_eq!(v["sources"][1]["value"], Json::Null);
    assert_eq!(v["sources"][1]["error"], "element_not_found");
}
