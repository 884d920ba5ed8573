// src/config/mod.rs
//! Service configuration: built-in defaults, then `config/user_count.toml`
//! (or `$USER_COUNT_CONFIG_PATH`), then individual env overrides.

pub mod sources;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub use sources::{SourceConfig, SourcesConfig};

pub const DEFAULT_CONFIG_PATH: &str = "config/user_count.toml";
pub const ENV_CONFIG_PATH: &str = "USER_COUNT_CONFIG_PATH";

/// Upper bound for every `*_secs` field (one year).
pub const MAX_DURATION_SECS: u64 = 365 * 24 * 3600;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Period between aggregation cycles.
    pub refresh_secs: u64,
    /// Wall-clock bound for a whole cycle across all sources.
    pub cycle_timeout_secs: u64,
    /// Bound on navigate + wait-for-network-idle in the rendered extractor.
    pub render_idle_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub max_render_sessions: usize,
    /// Consecutive failures of one source before escalating to `error!`.
    pub failure_alert_threshold: u32,
    pub cors_origin: String,
    pub debug_routes: bool,
    pub chrome_path: Option<PathBuf>,
    pub render_sandbox: bool,
    pub sources: SourcesConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            refresh_secs: 24 * 3600,
            cycle_timeout_secs: 120,
            render_idle_timeout_secs: 30,
            http_timeout_secs: 20,
            max_render_sessions: 1,
            failure_alert_threshold: 3,
            cors_origin: "https://getfocus.cc".to_string(),
            debug_routes: false,
            chrome_path: None,
            render_sandbox: true,
            sources: SourcesConfig::default(),
        }
    }
}

/// On-disk shape; every field optional so a file only states what it changes.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    refresh_secs: Option<u64>,
    cycle_timeout_secs: Option<u64>,
    render_idle_timeout_secs: Option<u64>,
    http_timeout_secs: Option<u64>,
    max_render_sessions: Option<usize>,
    failure_alert_threshold: Option<u32>,
    cors_origin: Option<String>,
    debug_routes: Option<bool>,
    chrome_path: Option<PathBuf>,
    render_sandbox: Option<bool>,
    #[serde(default)]
    sources: sources::FileSources,
}

impl AppConfig {
    /// Parse a TOML document on top of the defaults. No env overrides.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: FileConfig = toml::from_str(s).context("parsing user count config")?;
        let mut cfg = AppConfig::default();

        macro_rules! take {
            ($($field:ident),*) => {
                $(if let Some(v) = file.$field { cfg.$field = v; })*
            };
        }
        take!(
            refresh_secs,
            cycle_timeout_secs,
            render_idle_timeout_secs,
            http_timeout_secs,
            max_render_sessions,
            failure_alert_threshold,
            cors_origin,
            debug_routes,
            render_sandbox
        );
        if file.chrome_path.is_some() {
            cfg.chrome_path = file.chrome_path;
        }
        cfg.sources.apply_file(file.sources);

        cfg.sanitize()?;
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading user count config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Resolve the config the service runs with:
    /// 1) $USER_COUNT_CONFIG_PATH (must exist when set)
    /// 2) config/user_count.toml
    /// 3) built-in defaults
    ///
    /// followed by env overrides in every case.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!(
                    "{ENV_CONFIG_PATH} points to non-existent path {}",
                    pb.display()
                ));
            }
            Self::load_from(&pb)?
        } else {
            let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
            if fallback.exists() {
                Self::load_from(&fallback)?
            } else {
                AppConfig::default()
            }
        };

        cfg.apply_env();
        cfg.sanitize()?;
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Some(v) = env_u64("USER_COUNT_REFRESH_SECS") {
            self.refresh_secs = v;
        }
        if let Some(v) = env_u64("USER_COUNT_CYCLE_TIMEOUT_SECS") {
            self.cycle_timeout_secs = v;
        }
        if let Some(v) = env_string("USER_COUNT_CORS_ORIGIN") {
            self.cors_origin = v;
        }
        if let Some(v) = env_string("USER_COUNT_CHROME_PATH") {
            self.chrome_path = Some(PathBuf::from(v));
        }
        self.sources.apply_env();
    }

    fn sanitize(&mut self) -> Result<()> {
        for secs in [
            &mut self.refresh_secs,
            &mut self.cycle_timeout_secs,
            &mut self.render_idle_timeout_secs,
            &mut self.http_timeout_secs,
        ] {
            *secs = (*secs).clamp(1, MAX_DURATION_SECS);
        }
        self.max_render_sessions = self.max_render_sessions.max(1);
        self.failure_alert_threshold = self.failure_alert_threshold.max(1);

        for (name, src) in self.sources.iter() {
            if src.url.trim().is_empty() {
                bail!("sources.{name}.url must not be empty");
            }
            if src.selector.trim().is_empty() {
                bail!("sources.{name}.selector must not be empty");
            }
        }
        Ok(())
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout_secs)
    }

    pub fn render_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.render_idle_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

pub(crate) fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    let raw = env_string(key)?;
    match raw.parse::<u64>() {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(key, value = %raw, error = %e, "ignoring unparsable numeric env override");
            None
        }
    }
}
