//! Chromium-backed sessions via chromiumoxide. One browser process per session.

use super::{RenderSession, Renderer, SessionLease, SessionPool};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::ExtractError;

const BROWSER_CANDIDATES: [&str; 5] = [
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "microsoft-edge",
];

/// Locate a Chromium-compatible browser: explicit path first, then `PATH`.
pub fn find_browser(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = configured {
        if p.exists() {
            return Some(p.to_path_buf());
        }
        warn!(path = %p.display(), "configured browser path does not exist; searching PATH");
    }
    BROWSER_CANDIDATES
        .iter()
        .find_map(|name| which::which(name).ok())
}

pub struct ChromiumRenderer {
    pool: SessionPool,
    executable: Option<PathBuf>,
    sandbox: bool,
}

impl ChromiumRenderer {
    /// Nothing is launched here; each `open_session` starts its own browser.
    pub fn new(executable: Option<PathBuf>, max_sessions: usize, sandbox: bool) -> Self {
        Self {
            pool: SessionPool::new(max_sessions),
            executable,
            sandbox,
        }
    }

    fn browser_config(&self) -> Result<BrowserConfig, ExtractError> {
        let path = find_browser(self.executable.as_deref()).ok_or_else(|| {
            ExtractError::AutomationLaunch("no Chromium-compatible browser found".to_string())
        })?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking");
        if !self.sandbox {
            builder = builder.no_sandbox();
        }
        builder
            .build()
            .map_err(|e| ExtractError::AutomationLaunch(format!("browser config: {e}")))
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>, ExtractError> {
        let lease = self.pool.acquire().await?;
        let config = self.browser_config()?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ExtractError::AutomationLaunch(e.to_string()))?;

        // Drive the CDP connection for as long as the session lives.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let mut session = ChromiumSession {
            browser,
            page: None,
            handler,
            _lease: lease,
        };

        match session.browser.new_page("about:blank").await {
            Ok(page) => {
                session.page = Some(page);
                Ok(Box::new(session))
            }
            Err(e) => {
                Box::new(session).close().await;
                Err(ExtractError::AutomationLaunch(format!("new page: {e}")))
            }
        }
    }

    fn open_sessions(&self) -> usize {
        self.pool.open_sessions()
    }
}

/// A launched browser with a single page.
///
/// Dropping it aborts the CDP handler and lets chromiumoxide kill the child
/// process, so a cancelled extraction cannot leak the browser.
pub struct ChromiumSession {
    browser: Browser,
    page: Option<Page>,
    handler: JoinHandle<()>,
    _lease: SessionLease,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page, ExtractError> {
        self.page
            .as_ref()
            .ok_or_else(|| ExtractError::AutomationLaunch("session has no page".to_string()))
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn navigate_until_idle(
        &mut self,
        url: &str,
        timeout: Duration,
    ) -> Result<(), ExtractError> {
        let page = self.page()?;
        let fetch_err = |e: chromiumoxide::error::CdpError| ExtractError::Fetch(e.to_string());

        let wait = async {
            page.execute(SetLifecycleEventsEnabledParams::new(true))
                .await
                .map_err(fetch_err)?;
            let mut events = page
                .event_listener::<EventLifecycleEvent>()
                .await
                .map_err(fetch_err)?;

            page.goto(url).await.map_err(fetch_err)?;

            // Only idle signals from the document our navigation created count.
            let mut loader = None;
            while let Some(ev) = events.next().await {
                match ev.name.as_str() {
                    "init" => loader = Some(ev.loader_id.clone()),
                    "networkIdle" if loader.as_ref() == Some(&ev.loader_id) => {
                        debug!(url, "network idle");
                        return Ok(());
                    }
                    _ => {}
                }
            }
            Err(ExtractError::Fetch(
                "page closed before the network went idle".to_string(),
            ))
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| ExtractError::Timeout(timeout))?
    }

    async fn element_text(&mut self, selector: &str) -> Result<Option<String>, ExtractError> {
        let page = self.page()?;
        let element = match page.find_element(selector).await {
            Ok(el) => el,
            Err(e) => {
                debug!(selector, error = %e, "element lookup failed");
                return Ok(None);
            }
        };
        element
            .inner_text()
            .await
            .map_err(|e| ExtractError::Parse(format!("reading {selector:?}: {e}")))
    }

    async fn close(self: Box<Self>) {
        let mut this = self;
        if let Some(page) = this.page.take() {
            let _ = page.close().await;
        }
        if let Err(e) = this.browser.close().await {
            warn!(error = %e, "browser close failed; it will be killed on drop");
            return;
        }
        let _ = this.browser.wait().await;
    }
}
