use async_trait::async_trait;

use crate::config::SourceConfig;
use crate::error::ExtractError;
use crate::scrape::extract_count;
use crate::scrape::html::{fetch_page, select_text};
use crate::scrape::types::{CountExtractor, Source};

/// addons.mozilla.org listing. Several metadata cards share one class, so the
/// card is picked by a marker word ("Users") before reading digits.
pub struct FirefoxAddonsExtractor {
    url: String,
    selector: String,
    marker: Option<String>,
    client: reqwest::Client,
}

impl FirefoxAddonsExtractor {
    pub fn new(cfg: &SourceConfig, client: reqwest::Client) -> Self {
        Self {
            url: cfg.url.clone(),
            selector: cfg.selector.clone(),
            marker: cfg.marker.clone(),
            client,
        }
    }

    pub fn parse_page(
        html: &str,
        selector: &str,
        marker: Option<&str>,
    ) -> Result<u64, ExtractError> {
        let text = select_text(html, selector, marker)?;
        extract_count(&text)
    }
}

#[async_trait]
impl CountExtractor for FirefoxAddonsExtractor {
    async fn fetch_count(&self) -> Result<u64, ExtractError> {
        let body = fetch_page(&self.client, &self.url).await?;
        Self::parse_page(&body, &self.selector, self.marker.as_deref())
    }

    fn source(&self) -> Source {
        Source::Firefox
    }
}
