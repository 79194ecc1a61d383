//! Headless Chrome renderer for portals that build their result list client-side

use crate::config::{CrawlerConfig, RendererConfig};
use crate::crawler::renderer::{RenderError, RenderedPage, Renderer};
use anyhow::Context;
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use url::Url;

const VIEWPORT: (u32, u32) = (1280, 800);
const READY_POLL: Duration = Duration::from_millis(200);

/// Closes its tab when dropped, on every exit path
struct TabGuard(Arc<Tab>);

impl Drop for TabGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.close(true) {
            tracing::debug!("Failed to close tab: {}", e);
        }
    }
}

#[derive(Clone)]
struct ChromeSettings {
    user_agent: String,
    ready_selector: String,
    scroll_steps: u32,
    scroll_pause: Duration,
    navigation_timeout: Duration,
    content_wait_timeout: Duration,
}

/// Renders pages in a shared headless Chrome, one tab per page
pub struct ChromeRenderer {
    browser: Browser,
    settings: ChromeSettings,
}

impl ChromeRenderer {
    /// Launches Chrome
    ///
    /// # Arguments
    ///
    /// * `renderer` - Headless flag, proxy, user agent and scroll settings
    /// * `crawler` - Navigation and content-wait timeouts
    /// * `ready_selector` - Selector that signals the result list is present
    pub fn launch(
        renderer: &RendererConfig,
        crawler: &CrawlerConfig,
        ready_selector: &str,
    ) -> Result<Self, RenderError> {
        let browser = launch_browser(renderer).map_err(|e| RenderError::Setup(format!("{:#}", e)))?;

        tracing::info!(
            "Launched Chrome (headless: {}, proxy: {})",
            renderer.headless,
            renderer.use_proxy && renderer.proxy_url.is_some()
        );

        Ok(Self {
            browser,
            settings: ChromeSettings {
                user_agent: renderer.user_agent.clone(),
                ready_selector: ready_selector.to_string(),
                scroll_steps: renderer.scroll_steps,
                scroll_pause: Duration::from_millis(renderer.scroll_pause_ms),
                navigation_timeout: crawler.navigation_timeout(),
                content_wait_timeout: crawler.content_wait_timeout(),
            },
        })
    }
}

fn launch_browser(renderer: &RendererConfig) -> anyhow::Result<Browser> {
    let proxy = if renderer.use_proxy {
        renderer.proxy_url.as_deref()
    } else {
        None
    };

    let options = LaunchOptions::default_builder()
        .headless(renderer.headless)
        .window_size(Some(VIEWPORT))
        .proxy_server(proxy)
        .idle_browser_timeout(Duration::from_secs(600))
        .build()
        .context("Failed to build launch options")?;

    Browser::new(options).context("Failed to launch Chrome browser")
}

#[async_trait]
impl Renderer for ChromeRenderer {
    async fn render(&self, url: &Url) -> Result<RenderedPage, RenderError> {
        let browser = self.browser.clone();
        let settings = self.settings.clone();
        let url = url.clone();

        tokio::task::spawn_blocking(move || render_blocking(&browser, &settings, url))
            .await
            .map_err(|e| RenderError::Browser(format!("Render task failed: {}", e)))?
    }

    fn name(&self) -> &'static str {
        "chrome"
    }
}

fn render_blocking(
    browser: &Browser,
    settings: &ChromeSettings,
    url: Url,
) -> Result<RenderedPage, RenderError> {
    let tab = browser
        .new_tab()
        .map_err(|e| RenderError::Browser(format!("Failed to open tab: {}", e)))?;
    let guard = TabGuard(tab);
    let tab = &guard.0;

    tab.set_default_timeout(settings.navigation_timeout);
    tab.set_user_agent(&settings.user_agent, Some("pt-BR,pt;q=0.9"), None)
        .map_err(|e| RenderError::Browser(e.to_string()))?;

    tab.navigate_to(url.as_str())
        .and_then(|tab| tab.wait_until_navigated())
        .map_err(|e| navigation_error(e, settings.navigation_timeout))?;

    wait_for_document(tab, settings.content_wait_timeout)?;

    if let Err(e) =
        tab.wait_for_element_with_custom_timeout(&settings.ready_selector, settings.content_wait_timeout)
    {
        tracing::warn!("Ready selector not found on {}: {}", url, e);
    }

    for _ in 0..settings.scroll_steps {
        if let Err(e) = tab.evaluate("window.scrollBy(0, window.innerHeight)", false) {
            tracing::debug!("Scroll failed on {}: {}", url, e);
            break;
        }
        thread::sleep(settings.scroll_pause);
    }

    let html = tab
        .evaluate("document.documentElement.outerHTML", false)
        .map_err(|e| RenderError::Browser(e.to_string()))?
        .value
        .and_then(|value| value.as_str().map(str::to_string))
        .unwrap_or_default();

    let final_url = Url::parse(&tab.get_url()).unwrap_or(url);

    Ok(RenderedPage {
        url: final_url,
        status: None,
        html,
    })
}

/// Polls `document.readyState` until the document is complete
fn wait_for_document(tab: &Tab, timeout: Duration) -> Result<(), RenderError> {
    let started = Instant::now();
    loop {
        let ready = tab
            .evaluate("document.readyState", false)
            .ok()
            .and_then(|object| object.value)
            .map(|value| value.as_str() == Some("complete"))
            .unwrap_or(false);

        if ready {
            return Ok(());
        }
        if started.elapsed() >= timeout {
            return Err(RenderError::ContentWaitTimeout(timeout));
        }
        thread::sleep(READY_POLL);
    }
}

fn navigation_error(error: anyhow::Error, timeout: Duration) -> RenderError {
    if error.downcast_ref::<headless_chrome::util::Timeout>().is_some() {
        RenderError::NavigationTimeout(timeout)
    } else {
        RenderError::Navigation(format!("{:#}", error))
    }
}
