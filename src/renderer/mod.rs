//! Browser automation sessions for store pages that only show their count
//! after client-side scripts run.
//!
//! A session is a scoped resource: it owns a `SessionLease`, and dropping the
//! lease (normal close, error, timeout or cancellation) releases the pool slot.

pub mod chromium;

use async_trait::async_trait;
use metrics::gauge;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::ExtractError;

/// Something that can open isolated automation sessions.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Start a fresh session. Waits while the pool is at capacity.
    async fn open_session(&self) -> Result<Box<dyn RenderSession>, ExtractError>;
    /// Sessions currently alive (not yet dropped).
    fn open_sessions(&self) -> usize;
}

/// One live page in an automation session.
#[async_trait]
pub trait RenderSession: Send {
    /// Navigate and wait until network activity settles, bounded by `timeout`.
    async fn navigate_until_idle(&mut self, url: &str, timeout: Duration)
        -> Result<(), ExtractError>;
    /// Text content of the first element matching `selector`, `None` if absent.
    async fn element_text(&mut self, selector: &str) -> Result<Option<String>, ExtractError>;
    /// Orderly teardown. Dropping without calling this still releases the lease.
    async fn close(self: Box<Self>);
}

/// Caps concurrently open sessions and counts the live ones.
#[derive(Clone, Debug)]
pub struct SessionPool {
    permits: Arc<Semaphore>,
    open: Arc<AtomicUsize>,
}

impl SessionPool {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_sessions.max(1))),
            open: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn acquire(&self) -> Result<SessionLease, ExtractError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ExtractError::AutomationLaunch("session pool closed".to_string()))?;
        let now_open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        gauge!("user_count_render_sessions_open").set(now_open as f64);
        Ok(SessionLease {
            _permit: permit,
            open: Arc::clone(&self.open),
        })
    }

    pub fn open_sessions(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

/// Held by a live session; releases its pool slot on drop.
#[derive(Debug)]
pub struct SessionLease {
    _permit: OwnedSemaphorePermit,
    open: Arc<AtomicUsize>,
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        let now_open = self.open.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        gauge!("user_count_render_sessions_open").set(now_open as f64);
    }
}
