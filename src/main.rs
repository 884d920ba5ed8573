//! Focus user count service: binary entrypoint.
//! Boots the Axum HTTP server and the background aggregation scheduler.

use std::sync::Arc;

use focus_user_count::{
    api::{self, AppState},
    config::AppConfig,
    metrics::Metrics,
    scheduler::spawn_scheduler,
    Aggregator,
};
use shuttle_axum::ShuttleAxum;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default, JSON with USER_COUNT_LOG_JSON=1.
/// `try_init` so a subscriber already installed by the runtime wins.
fn init_tracing() {
    let json = std::env::var("USER_COUNT_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("focus_user_count=info,user_count=info,warn"));

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load_default()?;
    info!(
        refresh_secs = cfg.refresh_secs,
        cycle_timeout_secs = cfg.cycle_timeout_secs,
        "user count config loaded"
    );

    let metrics = Metrics::init(&cfg)?;

    let (aggregator, reader) = Aggregator::from_config(&cfg)?;
    spawn_scheduler(Arc::new(aggregator), cfg.refresh_period());

    let router = api::router(AppState::new(reader, &cfg)).merge(metrics.router());

    Ok(router.into())
}
