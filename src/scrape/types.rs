// src/scrape/types.rs
use serde::Serialize;

use crate::error::ExtractError;

/// One of the storefronts the extension is listed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Chrome,
    Firefox,
    Edge,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Chrome, Source::Firefox, Source::Edge];

    pub fn as_str(self) -> &'static str {
        match self {
            Source::Chrome => "chrome",
            Source::Firefox => "firefox",
            Source::Edge => "edge",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one extraction attempt. Exactly one of `value` / `error` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceResult {
    pub source: Source,
    pub value: Option<u64>,
    pub error: Option<ExtractError>,
}

impl SourceResult {
    pub fn ok(source: Source, value: u64) -> Self {
        Self {
            source,
            value: Some(value),
            error: None,
        }
    }

    pub fn failed(source: Source, error: ExtractError) -> Self {
        Self {
            source,
            value: None,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.value.is_some()
    }
}

impl From<(Source, Result<u64, ExtractError>)> for SourceResult {
    fn from((source, res): (Source, Result<u64, ExtractError>)) -> Self {
        match res {
            Ok(v) => SourceResult::ok(source, v),
            Err(e) => SourceResult::failed(source, e),
        }
    }
}

/// A single storefront scraper.
///
/// Implementations report failures through `Err`; `scrape::run_extractor`
/// turns that into a `SourceResult` so nothing escapes the extractor boundary.
#[async_trait::async_trait]
pub trait CountExtractor: Send + Sync {
    async fn fetch_count(&self) -> Result<u64, ExtractError>;
    fn source(&self) -> Source;
}
