use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SourceConfig;
use crate::error::ExtractError;
use crate::renderer::{RenderSession, Renderer};
use crate::scrape::extract_count;
use crate::scrape::types::{CountExtractor, Source};

/// Edge Add-ons listing. The count is injected by client-side scripts, so the
/// page is loaded in an automation session and read once the network is idle.
pub struct EdgeAddonsExtractor {
    url: String,
    selector: String,
    idle_timeout: Duration,
    renderer: Arc<dyn Renderer>,
}

impl EdgeAddonsExtractor {
    pub fn new(cfg: &SourceConfig, idle_timeout: Duration, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            url: cfg.url.clone(),
            selector: cfg.selector.clone(),
            idle_timeout,
            renderer,
        }
    }

    async fn read_count(&self, session: &mut dyn RenderSession) -> Result<u64, ExtractError> {
        session
            .navigate_until_idle(&self.url, self.idle_timeout)
            .await?;
        let text = session
            .element_text(&self.selector)
            .await?
            .ok_or_else(|| ExtractError::ElementNotFound(self.selector.clone()))?;
        extract_count(&text)
    }
}

#[async_trait]
impl CountExtractor for EdgeAddonsExtractor {
    async fn fetch_count(&self) -> Result<u64, ExtractError> {
        let mut session = self.renderer.open_session().await?;
        // Close on every completed path; if this future is dropped instead,
        // the session's own Drop releases it.
        let res = self.read_count(session.as_mut()).await;
        session.close().await;
        res
    }

    fn source(&self) -> Source {
        Source::Edge
    }
}
