// src/metrics.rs
use anyhow::Context;
use axum::{routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

use crate::config::AppConfig;

/// Extraction latency buckets (ms). Static pages land in the low hundreds,
/// rendered pages in the tens of seconds.
const EXTRACT_MS_BUCKETS: &[f64] = &[
    50.0, 100.0, 250.0, 500.0, 1_000.0, 2_500.0, 5_000.0, 10_000.0, 30_000.0, 60_000.0,
    120_000.0,
];

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and publish the schedule as
    /// static gauges. Fails if a recorder is already installed.
    pub fn init(cfg: &AppConfig) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full("user_count_extract_ms".to_string()),
                EXTRACT_MS_BUCKETS,
            )
            .context("prometheus: extract_ms buckets")?
            .install_recorder()
            .context("prometheus: install recorder")?;

        gauge!("user_count_refresh_secs").set(cfg.refresh_period().as_secs_f64());
        gauge!("user_count_cycle_timeout_secs").set(cfg.cycle_timeout().as_secs_f64());

        Ok(Self { handle })
    }

    /// `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{self, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt as _;

    // Only test in this binary that installs the global recorder.
    #[tokio::test]
    async fn metrics_route_exposes_schedule_gauges() {
        let metrics = Metrics::init(&AppConfig::default()).expect("install recorder");

        let resp = metrics
            .router()
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = body::to_bytes(resp.into_body(), 1 << 20).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("user_count_refresh_secs 86400"), "{text}");
        assert!(text.contains("user_count_cycle_timeout_secs 120"), "{text}");
    }
}
