// src/config/sources.rs
//! Per-store page location and selector contract. These track third-party
//! markup, so every field can be overridden from the file or the environment.

use serde::Deserialize;

use super::env_string;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub url: String,
    /// CSS selector for the node carrying the count.
    pub selector: String,
    /// Case-insensitive text a matching node must contain (filtered pages only).
    pub marker: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcesConfig {
    pub chrome: SourceConfig,
    pub firefox: SourceConfig,
    pub edge: SourceConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            chrome: SourceConfig {
                url: "https://chromewebstore.google.com/detail/focus/".to_string(),
                selector: ".F9iKBc".to_string(),
                marker: None,
            },
            firefox: SourceConfig {
                url: "https://addons.mozilla.org/en-US/firefox/addon/getfocus/".to_string(),
                selector: ".MetadataCard-list".to_string(),
                marker: Some("Users".to_string()),
            },
            edge: SourceConfig {
                url: "https://microsoftedge.microsoft.com/addons/detail/focus/".to_string(),
                selector: "#activeInstallText".to_string(),
                marker: None,
            },
        }
    }
}

impl SourcesConfig {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &SourceConfig)> {
        [
            ("chrome", &self.chrome),
            ("firefox", &self.firefox),
            ("edge", &self.edge),
        ]
        .into_iter()
    }

    pub(super) fn apply_file(&mut self, file: FileSources) {
        self.chrome.apply(file.chrome);
        self.firefox.apply(file.firefox);
        self.edge.apply(file.edge);
    }

    pub(super) fn apply_env(&mut self) {
        self.chrome.apply_env("CHROME_STORE");
        self.firefox.apply_env("FIREFOX_ADDONS");
        self.edge.apply_env("EDGE_ADDONS");
    }
}

impl SourceConfig {
    fn apply(&mut self, patch: SourcePatch) {
        if let Some(url) = patch.url {
            self.url = url;
        }
        if let Some(selector) = patch.selector {
            self.selector = selector;
        }
        if patch.marker.is_some() {
            self.marker = patch.marker;
        }
    }

    /// `<PREFIX>_URL`, `<PREFIX>_SELECTOR`, `<PREFIX>_MARKER`.
    fn apply_env(&mut self, prefix: &str) {
        self.apply(SourcePatch {
            url: env_string(&format!("{prefix}_URL")),
            selector: env_string(&format!("{prefix}_SELECTOR")),
            marker: env_string(&format!("{prefix}_MARKER")),
        });
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct FileSources {
    #[serde(default)]
    chrome: SourcePatch,
    #[serde(default)]
    firefox: SourcePatch,
    #[serde(default)]
    edge: SourcePatch,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SourcePatch {
    url: Option<String>,
    selector: Option<String>,
    marker: Option<String>,
}
