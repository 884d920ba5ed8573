// src/lib.rs
// Public library surface for the shuttle binary and integration tests.

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod renderer;
pub mod scheduler;
pub mod scrape;
pub mod streak;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{Aggregator, CycleOutcome};
pub use crate::api::router;
pub use crate::cache::{AggregateSnapshot, SnapshotReader};
pub use crate::error::ExtractError;
pub use crate::scrape::types::{CountExtractor, Source, SourceResult};
