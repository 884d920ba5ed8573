// src/cache.rs
//! Last published aggregate. One writer (the aggregator), any number of readers.
//! Publishing swaps a whole `Arc<AggregateSnapshot>`, so readers never see a
//! half-built snapshot.

use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::scrape::types::SourceResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSnapshot {
    pub total_count: u64,
    pub computed_at: DateTime<Utc>,
    pub source_results: Vec<SourceResult>,
}

impl AggregateSnapshot {
    /// Sum of successful values. `None` when every source failed.
    pub fn from_results(source_results: Vec<SourceResult>, computed_at: DateTime<Utc>) -> Option<Self> {
        if !source_results.iter().any(SourceResult::is_ok) {
            return None;
        }
        let total_count = source_results
            .iter()
            .filter_map(|r| r.value)
            .fold(0u64, u64::saturating_add);
        Some(Self {
            total_count,
            computed_at,
            source_results,
        })
    }
}

type Slot = Arc<RwLock<Option<Arc<AggregateSnapshot>>>>;

/// Create an empty cache, returning its only writer and a cloneable reader.
pub fn snapshot_cache() -> (SnapshotWriter, SnapshotReader) {
    let slot: Slot = Arc::new(RwLock::new(None));
    (
        SnapshotWriter {
            slot: Arc::clone(&slot),
        },
        SnapshotReader { slot },
    )
}

/// Write half. Deliberately not `Clone`.
#[derive(Debug)]
pub struct SnapshotWriter {
    slot: Slot,
}

impl SnapshotWriter {
    pub fn publish(&self, snapshot: AggregateSnapshot) -> Arc<AggregateSnapshot> {
        let snapshot = Arc::new(snapshot);
        *write_slot(&self.slot) = Some(Arc::clone(&snapshot));
        snapshot
    }

    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            slot: Arc::clone(&self.slot),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotReader {
    slot: Slot,
}

impl SnapshotReader {
    /// Last published snapshot, or `None` before the first successful cycle.
    pub fn current_snapshot(&self) -> Option<Arc<AggregateSnapshot>> {
        read_slot(&self.slot).clone()
    }

    pub fn is_populated(&self) -> bool {
        read_slot(&self.slot).is_some()
    }
}

// A panic while holding the lock cannot leave a torn value (the write is a
// single pointer swap), so poisoning is ignored.
fn read_slot(slot: &Slot) -> RwLockReadGuard<'_, Option<Arc<AggregateSnapshot>>> {
    match slot.read() {
        Ok(g) => g,
        Err(poison) => poison.into_inner(),
    }
}

fn write_slot(slot: &Slot) -> RwLockWriteGuard<'_, Option<Arc<AggregateSnapshot>>> {
    match slot.write() {
        Ok(g) => g,
        Err(poison) => poison.into_inner(),
    }
}
