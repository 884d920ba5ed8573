// tests/scheduler.rs
//
// Periodic scheduler under paused tokio time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use focus_user_count::cache::snapshot_cache;
use focus_user_count::scheduler::spawn_scheduler;
use focus_user_count::{Aggregator, CountExtractor, ExtractError, Source};

/// Fails for the first `fail_first` calls, then reports the call number.
struct Counting {
    calls: Arc<AtomicUsize>,
    fail_first: usize,
    delay: Duration,
}

#[async_trait]
impl CountExtractor for Counting {
    async fn fetch_count(&self) -> Result<u64, ExtractError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if n <= self.fail_first {
            return Err(ExtractError::Fetch("store down".into()));
        }
        Ok(n as u64)
    }

    fn source(&self) -> Source {
        Source::Chrome
    }
}

const DAY: Duration = Duration::from_secs(24 * 3600);

/// Let spawned tasks run without advancing the paused clock.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn first_cycle_runs_immediately_then_every_period() {
    let calls = Arc::new(AtomicUsize::new(0));
    let (writer, reader) = snapshot_cache();
    let agg = Aggregator::new(
        vec![Arc::new(Counting {
            calls: Arc::clone(&calls),
            fail_first: 0,
            delay: Duration::ZERO,
        })],
        writer,
        Duration::from_secs(60),
        3,
    );

    let handle = spawn_scheduler(Arc::new(agg), DAY);
    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(reader.current_snapshot().map(|s| s.total_count), Some(1));

    tokio::time::advance(DAY / 2).await;
    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1, "no cycle before the period elapses");

    tokio::time::advance(DAY / 2).await;
    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(reader.current_snapshot().map(|s| s.total_count), Some(2));

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn failing_cycles_do_not_stop_the_schedule() {
    let calls = Arc::new(AtomicUsize::new(0));
    let (writer, reader) = snapshot_cache();
    let agg = Aggregator::new(
        vec![Arc::new(Counting {
            calls: Arc::clone(&calls),
            fail_first: 2,
            delay: Duration::ZERO,
        })],
        writer,
        Duration::from_secs(60),
        3,
    );

    let handle = spawn_scheduler(Arc::new(agg), DAY);
    settle().await;
    assert!(reader.current_snapshot().is_none());

    tokio::time::advance(DAY).await;
    settle().await;
    assert!(reader.current_snapshot().is_none());

    tokio::time::advance(DAY).await;
    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(reader.current_snapshot().map(|s| s.total_count), Some(3));

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn slow_cycle_delays_next_instead_of_overlapping() {
    let calls = Arc::new(AtomicUsize::new(0));
    let (writer, _reader) = snapshot_cache();
    // Each cycle takes 90s against a 60s period (cycle deadline well above that).
    let agg = Aggregator::new(
        vec![Arc::new(Counting {
            calls: Arc::clone(&calls),
            fail_first: 0,
            delay: Duration::from_secs(90),
        })],
        writer,
        Duration::from_secs(600),
        3,
    );

    let handle = spawn_scheduler(Arc::new(agg), Duration::from_secs(60));
    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // At t=60 the first cycle is still running: no second start.
    tokio::time::advance(Duration::from_secs(60)).await;
    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // First cycle ends at t=90; the missed tick fires right after.
    tokio::time::advance(Duration::from_secs(31)).await;
    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    handle.abort();
}
