use crate::model::{
    OriginSource, Portal, SearchArea, SearchFilters, SearchOrigin, TransactionType,
};
use crate::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Main configuration structure for listing-crawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub search: SearchConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of pages rendered at once
    pub max_concurrency: u32,

    /// Extra attempts per request after a retryable failure
    pub max_retries: u32,

    /// Page cap per search origin
    pub max_pages_per_origin: u32,

    pub navigation_timeout_secs: u64,

    pub content_wait_timeout_secs: u64,

    /// Bound on rendering plus extraction of one page
    pub request_handler_timeout_secs: u64,

    /// Delay before a retry, multiplied by the retry number (milliseconds)
    pub retry_backoff_ms: u64,

    /// Bodies shorter than this many bytes are treated as blocked
    pub min_content_length: usize,

    /// Pages with fewer records are reported as structural misses
    pub min_expected_records: Option<u32>,

    /// Overrides the portal's known full-page size
    pub expected_page_size: Option<u32>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 2,
            max_retries: 2,
            max_pages_per_origin: 10,
            navigation_timeout_secs: 60,
            content_wait_timeout_secs: 30,
            request_handler_timeout_secs: 120,
            retry_backoff_ms: 2000,
            min_content_length: 512,
            min_expected_records: None,
            expected_page_size: None,
        }
    }
}

impl CrawlerConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn content_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.content_wait_timeout_secs)
    }

    pub fn request_handler_timeout(&self) -> Duration {
        Duration::from_secs(self.request_handler_timeout_secs)
    }
}

/// What to search for
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SearchConfig {
    /// Portal identifier, e.g. "zapimoveis" or "vivareal"
    pub portal: String,

    #[serde(default)]
    pub transaction: TransactionType,

    #[serde(default = "default_property_type")]
    pub property_type: String,

    #[serde(default)]
    pub neighborhoods: Vec<String>,

    /// Raw search URLs crawled as their own origins
    #[serde(default)]
    pub seed_urls: Vec<String>,

    #[serde(flatten)]
    pub area: SearchArea,

    #[serde(default)]
    pub filters: SearchFilters,
}

fn default_property_type() -> String {
    "apartamento".to_string()
}

impl SearchConfig {
    /// Resolves the portal identifier
    ///
    /// # Returns
    ///
    /// * `Ok(Portal)` - A supported portal
    /// * `Err(ConfigError::UnsupportedPortal)` - The identifier is unknown
    pub fn portal(&self) -> ConfigResult<Portal> {
        Ok(self.portal.parse::<Portal>()?)
    }
}

/// Page rendering engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RenderEngine {
    /// Plain HTTP GET; works for server-rendered result pages
    #[default]
    Http,
    /// Headless Chrome; needs the `chrome` feature
    Chrome,
}

/// Renderer configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RendererConfig {
    pub engine: RenderEngine,
    pub headless: bool,

    /// Route traffic through a proxy (`proxy-url`, or the system proxy)
    pub use_proxy: bool,
    pub proxy_url: Option<String>,

    pub user_agent: String,

    /// Scrolls performed to trigger lazy-loaded cards
    pub scroll_steps: u32,
    pub scroll_pause_ms: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            engine: RenderEngine::Http,
            headless: true,
            use_proxy: false,
            proxy_url: None,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            scroll_steps: 3,
            scroll_pause_ms: 800,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database file
    pub database_path: String,

    /// Optional JSON-lines export of every record and failure
    pub jsonl_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "./listings.db".to_string(),
            jsonl_path: None,
        }
    }
}

impl Config {
    /// Builds one search origin per neighborhood and per seed URL
    ///
    /// Neighborhood origins come first, in configuration order.
    pub fn origins(&self) -> ConfigResult<Vec<SearchOrigin>> {
        let portal = self.search.portal()?;
        let template = SearchOrigin {
            portal,
            source: OriginSource::Neighborhood(String::new()),
            transaction: self.search.transaction,
            property_type: self.search.property_type.clone(),
            area: self.search.area.clone(),
            filters: self.search.filters.clone(),
        };

        let mut origins = Vec::new();
        for name in &self.search.neighborhoods {
            origins.push(SearchOrigin {
                source: OriginSource::Neighborhood(name.trim().to_string()),
                ..template.clone()
            });
        }
        for seed in &self.search.seed_urls {
            let url = Url::parse(seed).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e))
            })?;
            origins.push(SearchOrigin {
                source: OriginSource::SeedUrl(url),
                ..template.clone()
            });
        }

        Ok(origins)
    }
}
