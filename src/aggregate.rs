// src/aggregate.rs
//! One aggregation cycle: run every extractor in isolation, sum what succeeded,
//! publish if anything did.

use anyhow::Result;
use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::{error, info, warn};

use crate::cache::{snapshot_cache, AggregateSnapshot, SnapshotReader, SnapshotWriter};
use crate::config::AppConfig;
use crate::error::ExtractError;
use crate::renderer::chromium::ChromiumRenderer;
use crate::scrape::types::{CountExtractor, SourceResult};
use crate::scrape::{html, providers, run_extractor};
use crate::streak::{FailureStreaks, StreakEvent};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "user_count_cycles_total",
            "Aggregation cycles by outcome (published/unchanged/skipped)."
        );
        describe_counter!(
            "user_count_source_errors_total",
            "Per-source extraction failures by kind."
        );
        describe_histogram!(
            "user_count_extract_ms",
            "Per-source extraction time in milliseconds."
        );
        describe_gauge!("user_count_total", "Last published aggregate user count.");
        describe_gauge!(
            "user_count_last_published_ts",
            "Unix ts of the last published snapshot."
        );
        describe_gauge!(
            "user_count_failure_streak",
            "Consecutive failed cycles per source."
        );
        describe_gauge!(
            "user_count_render_sessions_open",
            "Automation sessions currently open."
        );
    });
}

#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// At least one source succeeded; the cache now holds this snapshot.
    Published(Arc<AggregateSnapshot>),
    /// Every source failed; the cache was not touched.
    Unchanged(Vec<SourceResult>),
    /// Another cycle was already in flight.
    Skipped,
}

pub struct Aggregator {
    extractors: Vec<Arc<dyn CountExtractor>>,
    writer: SnapshotWriter,
    cycle_timeout: Duration,
    streaks: Mutex<FailureStreaks>,
    in_flight: tokio::sync::Mutex<()>,
}

impl Aggregator {
    pub fn new(
        extractors: Vec<Arc<dyn CountExtractor>>,
        writer: SnapshotWriter,
        cycle_timeout: Duration,
        failure_alert_threshold: u32,
    ) -> Self {
        Self {
            extractors,
            writer,
            cycle_timeout,
            streaks: Mutex::new(FailureStreaks::new(failure_alert_threshold)),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    /// Production wiring: HTTP extractors for Chrome/Firefox, Chromium for Edge.
    pub fn from_config(cfg: &AppConfig) -> Result<(Self, SnapshotReader)> {
        let client = html::http_client(cfg.http_timeout())?;
        let renderer = Arc::new(ChromiumRenderer::new(
            cfg.chrome_path.clone(),
            cfg.max_render_sessions,
            cfg.render_sandbox,
        ));
        let extractors = providers::from_config(cfg, client, renderer);
        let (writer, reader) = snapshot_cache();
        let agg = Self::new(
            extractors,
            writer,
            cfg.cycle_timeout(),
            cfg.failure_alert_threshold,
        );
        Ok((agg, reader))
    }

    pub fn reader(&self) -> SnapshotReader {
        self.writer.reader()
    }

    /// Run one cycle unless one is already running. Never fails; the only
    /// side effect is a cache write when at least one source succeeded.
    pub async fn run_cycle(&self) -> CycleOutcome {
        ensure_metrics_described();

        let Ok(_guard) = self.in_flight.try_lock() else {
            info!(target: "user_count", "cycle already in flight; skipping");
            counter!("user_count_cycles_total", "outcome" => "skipped").increment(1);
            return CycleOutcome::Skipped;
        };

        let t0 = std::time::Instant::now();
        let results = self.collect().await;
        self.report(&results);

        match AggregateSnapshot::from_results(results.clone(), Utc::now()) {
            Some(snapshot) => {
                let snapshot = self.writer.publish(snapshot);
                counter!("user_count_cycles_total", "outcome" => "published").increment(1);
                gauge!("user_count_total").set(snapshot.total_count as f64);
                gauge!("user_count_last_published_ts")
                    .set(snapshot.computed_at.timestamp().max(0) as f64);
                info!(
                    target: "user_count",
                    total = snapshot.total_count,
                    ok = snapshot.source_results.iter().filter(|r| r.is_ok()).count(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "published user count"
                );
                CycleOutcome::Published(snapshot)
            }
            None => {
                counter!("user_count_cycles_total", "outcome" => "unchanged").increment(1);
                warn!(
                    target: "user_count",
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "all sources failed; cache left unchanged"
                );
                CycleOutcome::Unchanged(results)
            }
        }
    }

    /// Every extractor in its own task, all bounded by one cycle deadline.
    /// Results come back in extractor order.
    async fn collect(&self) -> Vec<SourceResult> {
        let timeout = self.cycle_timeout;
        let deadline = cycle_deadline(tokio::time::Instant::now(), timeout);

        let tasks: Vec<_> = self
            .extractors
            .iter()
            .map(|ex| {
                let ex = Arc::clone(ex);
                let source = ex.source();
                let handle = tokio::spawn(async move {
                    // On expiry the extraction future is dropped, which tears
                    // down anything it still holds (e.g. a browser session).
                    match tokio::time::timeout_at(deadline, run_extractor(ex.as_ref())).await {
                        Ok(res) => res,
                        Err(_) => SourceResult::failed(source, ExtractError::Timeout(timeout)),
                    }
                });
                (source, handle)
            })
            .collect();

        let _abort = AbortOnDrop(tasks.iter().map(|(_, h)| h.abort_handle()).collect());

        let mut out = Vec::with_capacity(tasks.len());
        for (source, handle) in tasks {
            let res = match handle.await {
                Ok(res) => res,
                Err(e) => SourceResult::failed(source, ExtractError::Panicked(e.to_string())),
            };
            out.push(res);
        }
        out
    }

    /// Best-effort operator visibility; never changes the cycle outcome.
    fn report(&self, results: &[SourceResult]) {
        let mut streaks = match self.streaks.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        };

        for r in results {
            let source = r.source.as_str();
            if let Some(e) = &r.error {
                counter!("user_count_source_errors_total", "source" => source, "kind" => e.kind())
                    .increment(1);
                warn!(target: "user_count", source, kind = e.kind(), error = %e, "source extraction failed");
            }

            match streaks.record(r.source, r.is_ok()) {
                StreakEvent::Escalated(n) => error!(
                    target: "user_count",
                    source,
                    consecutive_failures = n,
                    "source failing repeatedly; store markup may have changed"
                ),
                StreakEvent::Recovered(n) => info!(
                    target: "user_count",
                    source,
                    after_failures = n,
                    "source recovered"
                ),
                StreakEvent::None => {}
            }
            gauge!("user_count_failure_streak", "source" => source)
                .set(f64::from(streaks.streak(r.source)));
        }
    }

    #[cfg(test)]
    pub(crate) fn streak(&self, source: crate::scrape::types::Source) -> u32 {
        self.streaks.lock().map(|s| s.streak(source)).unwrap_or(0)
    }
}

/// `now + timeout`, saturating to roughly 30 years out instead of overflowing.
fn cycle_deadline(now: tokio::time::Instant, timeout: Duration) -> tokio::time::Instant {
    const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);
    now.checked_add(timeout)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Aborts extractor tasks if the cycle itself is cancelled.
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for h in &self.0 {
            h.abort();
        }
    }
}
