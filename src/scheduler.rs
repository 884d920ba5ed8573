// src/scheduler.rs
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::aggregate::{Aggregator, CycleOutcome};

/// Run a cycle immediately, then every `period`, for the life of the process.
///
/// The next tick waits for the current cycle to finish, so cycles never
/// overlap; a slow cycle delays the schedule instead of stacking up. Each
/// cycle runs in its own task so a panic is logged and the loop keeps going.
pub fn spawn_scheduler(aggregator: Arc<Aggregator>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;

            let agg = Arc::clone(&aggregator);
            match tokio::spawn(async move { agg.run_cycle().await }).await {
                Ok(CycleOutcome::Published(s)) => {
                    info!(target: "user_count", total = s.total_count, "scheduled cycle published")
                }
                Ok(CycleOutcome::Unchanged(_)) => {
                    info!(target: "user_count", "scheduled cycle left cache unchanged")
                }
                Ok(CycleOutcome::Skipped) => {
                    info!(target: "user_count", "scheduled cycle skipped")
                }
                Err(e) => {
                    error!(target: "user_count", error = %e, "cycle aborted; waiting for next tick")
                }
            }
        }
    })
}
