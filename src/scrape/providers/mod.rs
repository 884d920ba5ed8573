// src/scrape/providers/mod.rs
pub mod chrome_web_store;
pub mod edge_addons;
pub mod firefox_addons;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::renderer::Renderer;
use crate::scrape::types::CountExtractor;

pub use chrome_web_store::ChromeWebStoreExtractor;
pub use edge_addons::EdgeAddonsExtractor;
pub use firefox_addons::FirefoxAddonsExtractor;

/// All three store extractors in canonical order (Chrome, Firefox, Edge).
pub fn from_config(
    cfg: &AppConfig,
    client: reqwest::Client,
    renderer: Arc<dyn Renderer>,
) -> Vec<Arc<dyn CountExtractor>> {
    vec![
        Arc::new(ChromeWebStoreExtractor::new(
            &cfg.sources.chrome,
            client.clone(),
        )),
        Arc::new(FirefoxAddonsExtractor::new(&cfg.sources.firefox, client)),
        Arc::new(EdgeAddonsExtractor::new(
            &cfg.sources.edge,
            cfg.render_idle_timeout(),
            renderer,
        )),
    ]
}
