use axum::{
    extract::State,
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::cache::SnapshotReader;
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    snapshots: SnapshotReader,
    debug_routes: bool,
    cors_origin: String,
}

impl AppState {
    pub fn new(snapshots: SnapshotReader, cfg: &AppConfig) -> Self {
        Self {
            snapshots,
            debug_routes: cfg.debug_routes,
            cors_origin: cfg.cors_origin.clone(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let mut r = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/user_count", get(user_count));
    if state.debug_routes {
        r = r.route("/debug/snapshot", get(debug_snapshot));
    }
    r.layer(cors_layer(&state.cors_origin)).with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let base = CorsLayer::new().allow_methods([Method::GET]);
    match origin.parse::<HeaderValue>() {
        Ok(v) => base.allow_origin(v),
        Err(e) => {
            warn!(origin, error = %e, "invalid CORS origin; cross-origin reads disabled");
            base
        }
    }
}

#[derive(Serialize)]
struct UserCountResp {
    #[serde(rename = "userCount")]
    user_count: u64,
}

#[derive(Serialize)]
struct ErrorResp {
    error: &'static str,
}

async fn user_count(State(state): State<AppState>) -> Response {
    match state.snapshots.current_snapshot() {
        Some(s) => Json(UserCountResp {
            user_count: s.total_count,
        })
        .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResp {
                error: "User count not yet available",
            }),
        )
            .into_response(),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotOut {
    total_count: u64,
    computed_at: String,
    sources: Vec<SourceOut>,
}

#[derive(Serialize)]
struct SourceOut {
    source: &'static str,
    value: Option<u64>,
    /// Error kind only; messages stay in the logs.
    error: Option<&'static str>,
}

async fn debug_snapshot(State(state): State<AppState>) -> Json<Option<SnapshotOut>> {
    let out = state.snapshots.current_snapshot().map(|s| SnapshotOut {
        total_count: s.total_count,
        computed_at: s.computed_at.to_rfc3339(),
        sources: s
            .source_results
            .iter()
            .map(|r| SourceOut {
                source: r.source.as_str(),
                value: r.value,
                error: r.error.as_ref().map(|e| e.kind()),
            })
            .collect(),
    });
    Json(out)
}
