//! Page renderers
//!
//! A renderer turns a URL into a [`RenderedPage`] snapshot once the page is
//! ready. Waiting for content and triggering lazy-loaded cards happen entirely
//! inside the renderer; extraction only ever sees the finished snapshot.

use crate::config::{CrawlerConfig, RendererConfig};
use async_trait::async_trait;
use reqwest::{Client, Proxy};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A rendered page, ready for extraction
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Final URL after redirects
    pub url: Url,

    /// HTTP status of the document, when the renderer knows it
    pub status: Option<u16>,

    /// Document HTML after lazy content was triggered
    pub html: String,
}

/// Errors raised while rendering a page
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Navigation timed out after {0:?}")]
    NavigationTimeout(Duration),

    #[error("Content not ready after {0:?}")]
    ContentWaitTimeout(Duration),

    #[error("HTTP {0}")]
    HttpStatus(u16),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Failed to set up renderer: {0}")]
    Setup(String),
}

/// Something that can render a search page
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Navigates to `url` and returns the ready page
    async fn render(&self, url: &Url) -> Result<RenderedPage, RenderError>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The renderer configuration (user agent, proxy)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client (e.g. a bad proxy URL)
///
/// # Example
///
/// ```no_run
/// use listing_crawl::config::RendererConfig;
/// use listing_crawl::crawler::build_http_client;
///
/// let client = build_http_client(&RendererConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &RendererConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.clone())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if !config.use_proxy {
        builder = builder.no_proxy();
    } else if let Some(proxy_url) = &config.proxy_url {
        builder = builder.proxy(Proxy::all(proxy_url.as_str())?);
    }

    builder.build()
}

/// Renders pages with a plain HTTP GET
///
/// Suitable when the portal serves its result cards in the initial HTML.
/// Navigation covers sending the request and receiving headers; the content
/// wait covers reading the body.
pub struct HttpRenderer {
    client: Client,
    navigation_timeout: Duration,
    content_wait_timeout: Duration,
}

impl HttpRenderer {
    /// Creates an HTTP renderer from configuration
    pub fn new(renderer: &RendererConfig, crawler: &CrawlerConfig) -> Result<Self, RenderError> {
        let client = build_http_client(renderer).map_err(|e| RenderError::Setup(e.to_string()))?;
        Ok(Self::with_client(
            client,
            crawler.navigation_timeout(),
            crawler.content_wait_timeout(),
        ))
    }

    /// Creates an HTTP renderer around an existing client
    pub fn with_client(
        client: Client,
        navigation_timeout: Duration,
        content_wait_timeout: Duration,
    ) -> Self {
        Self {
            client,
            navigation_timeout,
            content_wait_timeout,
        }
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, url: &Url) -> Result<RenderedPage, RenderError> {
        let response = tokio::time::timeout(
            self.navigation_timeout,
            self.client.get(url.clone()).send(),
        )
        .await
        .map_err(|_| RenderError::NavigationTimeout(self.navigation_timeout))?
        .map_err(|e| {
            if e.is_timeout() {
                RenderError::NavigationTimeout(self.navigation_timeout)
            } else if e.is_connect() {
                RenderError::Navigation(format!("Connection failed: {}", e))
            } else {
                RenderError::Navigation(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(RenderError::HttpStatus(status.as_u16()));
        }

        let final_url = response.url().clone();
        let html = tokio::time::timeout(self.content_wait_timeout, response.text())
            .await
            .map_err(|_| RenderError::ContentWaitTimeout(self.content_wait_timeout))?
            .map_err(|e| {
                if e.is_timeout() {
                    RenderError::ContentWaitTimeout(self.content_wait_timeout)
                } else {
                    RenderError::Navigation(format!("Failed to read body: {}", e))
                }
            })?;

        Ok(RenderedPage {
            url: final_url,
            status: Some(status.as_u16()),
            html,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
