use async_trait::async_trait;

use crate::config::SourceConfig;
use crate::error::ExtractError;
use crate::scrape::extract_count;
use crate::scrape::html::{fetch_page, select_text};
use crate::scrape::types::{CountExtractor, Source};

/// Chrome Web Store listing: the count sits in one static text node.
pub struct ChromeWebStoreExtractor {
    url: String,
    selector: String,
    client: reqwest::Client,
}

impl ChromeWebStoreExtractor {
    pub fn new(cfg: &SourceConfig, client: reqwest::Client) -> Self {
        Self {
            url: cfg.url.clone(),
            selector: cfg.selector.clone(),
            client,
        }
    }

    pub fn parse_page(html: &str, selector: &str) -> Result<u64, ExtractError> {
        let text = select_text(html, selector, None)?;
        extract_count(&text)
    }
}

#[async_trait]
impl CountExtractor for ChromeWebStoreExtractor {
    async fn fetch_count(&self) -> Result<u64, ExtractError> {
        let body = fetch_page(&self.client, &self.url).await?;
        Self::parse_page(&body, &self.selector)
    }

    fn source(&self) -> Source {
        Source::Chrome
    }
}
