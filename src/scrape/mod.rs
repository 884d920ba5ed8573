// src/scrape/mod.rs
pub mod html;
pub mod providers;
pub mod types;

use crate::error::ExtractError;
use crate::scrape::types::{CountExtractor, SourceResult};
use metrics::histogram;
use once_cell::sync::OnceCell;
use regex::Regex;

/// First run of ASCII digits and thousands separators, never ending on a separator.
fn digit_run() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"[0-9](?:[0-9,]*[0-9])?").unwrap())
}

/// Pull the count out of a text node, e.g. `"1,234,567 users"` -> `1234567`.
pub fn extract_count(text: &str) -> Result<u64, ExtractError> {
    let m = digit_run()
        .find(text)
        .ok_or_else(|| ExtractError::NoNumberFound(text.trim().to_string()))?;

    let raw = m.as_str();
    let digits: String = raw.chars().filter(|c| *c != ',').collect();
    digits
        .parse::<u64>()
        .map_err(|e| ExtractError::NumericParse {
            raw: raw.to_string(),
            reason: e.to_string(),
        })
}

/// Run one extractor and capture its outcome as data, with timing telemetry.
pub async fn run_extractor(extractor: &dyn CountExtractor) -> SourceResult {
    let source = extractor.source();
    let t0 = std::time::Instant::now();
    let res = extractor.fetch_count().await;

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("user_count_extract_ms", "source" => source.as_str()).record(ms);

    SourceResult::from((source, res))
}
