// src/error.rs
//! Failure taxonomy for a single extraction attempt.
//!
//! Every variant is data: extractors hand these back inside a `SourceResult`
//! and nothing above the extractor boundary ever sees them as a propagated error.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// Network failure or non-success HTTP status.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// The selector (and marker, if any) matched nothing usable.
    #[error("expected markup not found: {0}")]
    Parse(String),

    /// Rendered page loaded but the configured element is absent.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// Structure was present but its text holds no digits.
    #[error("no number in text {0:?}")]
    NoNumberFound(String),

    /// Digits were found but do not fit a count.
    #[error("could not parse {raw:?} as a count: {reason}")]
    NumericParse { raw: String, reason: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The automation session could not be started.
    #[error("automation session failed to launch: {0}")]
    AutomationLaunch(String),

    /// The extractor task panicked; recorded like any other failure.
    #[error("extractor panicked: {0}")]
    Panicked(String),
}

impl ExtractError {
    /// Stable short label for logs, metric labels and the debug view.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractError::Fetch(_) => "fetch",
            ExtractError::Parse(_) => "parse",
            ExtractError::ElementNotFound(_) => "element_not_found",
            ExtractError::NoNumberFound(_) => "no_number_found",
            ExtractError::NumericParse { .. } => "numeric_parse",
            ExtractError::Timeout(_) => "timeout",
            ExtractError::AutomationLaunch(_) => "automation_launch",
            ExtractError::Panicked(_) => "panicked",
        }
    }
}

impl From<reqwest::Error> for ExtractError {
    fn from(e: reqwest::Error) -> Self {
        ExtractError::Fetch(e.to_string())
    }
}
