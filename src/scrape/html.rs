// src/scrape/html.rs
//! Shared helpers for the store pages that ship their count in static markup.

use anyhow::Context;
use scraper::{Html, Selector};
use std::time::Duration;

use crate::error::ExtractError;

/// Client shared by the static-page extractors.
pub fn http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("focus-user-count/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(5).min(timeout))
        .timeout(timeout)
        .build()
        .context("building store page http client")
}

/// One GET of a store page. Non-success statuses are fetch failures.
pub async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<String, ExtractError> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(ExtractError::Fetch(format!("{url} returned {status}")));
    }
    Ok(resp.text().await?)
}

/// Text of the first node matching `selector` whose text contains `marker`
/// (case-insensitive). Without a marker the first match is taken.
pub fn select_text(
    html: &str,
    selector: &str,
    marker: Option<&str>,
) -> Result<String, ExtractError> {
    let sel = Selector::parse(selector)
        .map_err(|e| ExtractError::Parse(format!("invalid selector {selector:?}: {e}")))?;
    let doc = Html::parse_document(html);
    let marker = marker.map(str::to_lowercase);

    let mut matched_any = false;
    for node in doc.select(&sel) {
        matched_any = true;
        let text = collapse_ws(&node.text().collect::<Vec<_>>().join(" "));
        match &marker {
            Some(m) if !text.to_lowercase().contains(m.as_str()) => continue,
            _ => return Ok(text),
        }
    }

    if !matched_any {
        return Err(ExtractError::Parse(format!(
            "selector {selector:?} matched no nodes"
        )));
    }
    Err(ExtractError::Parse(format!(
        "no {selector:?} node contains marker {:?}",
        marker.unwrap_or_default()
    )))
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <dl class="card"><dt>Rating</dt><dd>4.5 stars</dd></dl>
          <dl class="card"><dt>Users</dt><dd>1,234</dd></dl>
          <div class="count">  10,000
             users </div>
        </body></html>"#;

    #[test]
    fn first_match_without_marker() {
        assert_eq!(select_text(PAGE, ".count", None).unwrap(), "10,000 users");
    }

    #[test]
    fn marker_disambiguates_between_matches() {
        assert_eq!(
            select_text(PAGE, "dl.card", Some("users")).unwrap(),
            "Users 1,234"
        );
    }

    #[test]
    fn no_match_is_parse_error() {
        let err = select_text(PAGE, ".missing", None).unwrap_err();
        assert_eq!(err.kind(), "parse");
    }

    #[test]
    fn marker_without_hit_is_parse_error() {
        let err = select_text(PAGE, "dl.card", Some("downloads")).unwrap_err();
        assert!(err.to_string().contains("downloads"), "{err}");
    }
}
