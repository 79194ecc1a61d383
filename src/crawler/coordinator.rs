//! Crawler coordinator - main crawl orchestration logic
//!
//! This module wires the crawl together:
//! - Seeding one request per search origin through the URL builder
//! - Building the renderer and dataset sinks from configuration
//! - Tracking the run in the database
//! - Running the scheduler and producing the final report

use crate::config::{Config, CrawlerConfig, RenderEngine};
use crate::crawler::observer::{CrawlEvent, CrawlObserver, TracingObserver};
use crate::crawler::queue::EnqueueOutcome;
use crate::crawler::renderer::{HttpRenderer, Renderer};
use crate::crawler::scheduler::Scheduler;
use crate::model::{CrawlRequest, Portal, SearchOrigin};
use crate::output::CrawlReport;
use crate::storage::{DatasetSink, FanoutSink, JsonLinesSink, RunStatus, SqliteSink};
use crate::url::build_search_url;
use std::path::Path;
use std::sync::Arc;

/// A crawl over a set of search origins
pub struct Crawler {
    scheduler: Scheduler,
    origins_seeded: u64,
}

impl Crawler {
    /// Creates a crawler that logs its events through `tracing`
    pub fn new(
        config: &CrawlerConfig,
        renderer: Arc<dyn Renderer>,
        sink: Arc<dyn DatasetSink>,
    ) -> Self {
        Self::with_observer(config, renderer, sink, Arc::new(TracingObserver))
    }

    /// Creates a crawler reporting to a custom observer
    pub fn with_observer(
        config: &CrawlerConfig,
        renderer: Arc<dyn Renderer>,
        sink: Arc<dyn DatasetSink>,
        observer: Arc<dyn CrawlObserver>,
    ) -> Self {
        Self {
            scheduler: Scheduler::new(config, renderer, sink, observer),
            origins_seeded: 0,
        }
    }

    /// Queues the first page of one origin
    ///
    /// # Returns
    ///
    /// * `Ok(EnqueueOutcome::Queued)` - The origin will be crawled
    /// * `Ok(EnqueueOutcome::AlreadyQueued)` - Another origin already maps to the same URL
    /// * `Err(CrawlError)` - No URL could be built for the origin
    pub fn seed_origin(&mut self, origin: SearchOrigin) -> crate::Result<EnqueueOutcome> {
        let url = build_search_url(&origin)?;
        let label = origin.label();
        let request = CrawlRequest::seed(url, Arc::new(origin))?;
        let url = request.url.to_string();

        let outcome = self.scheduler.queue().enqueue(request);
        let observer = self.scheduler.observer();
        match outcome {
            EnqueueOutcome::Queued => {
                self.origins_seeded += 1;
                observer.on_event(&CrawlEvent::Seeded { origin: label, url });
            }
            EnqueueOutcome::AlreadyQueued => {
                self.scheduler.record_duplicate();
                observer.on_event(&CrawlEvent::Duplicate { url });
            }
        }
        Ok(outcome)
    }

    /// Queues the first page of every origin
    ///
    /// # Returns
    ///
    /// The number of origins actually queued (duplicates excluded)
    pub fn seed(&mut self, origins: impl IntoIterator<Item = SearchOrigin>) -> crate::Result<u64> {
        let before = self.origins_seeded;
        for origin in origins {
            self.seed_origin(origin)?;
        }
        Ok(self.origins_seeded - before)
    }

    /// Crawls until the queue is drained
    pub async fn run(self) -> CrawlReport {
        let mut report = self.scheduler.run().await;
        report.origins_seeded = self.origins_seeded;
        report
    }
}

/// Builds the renderer selected by `[renderer] engine`
///
/// # Arguments
///
/// * `config` - The full configuration
/// * `portal` - The portal being crawled (selects the Chrome ready selector)
pub fn build_renderer(config: &Config, portal: Portal) -> crate::Result<Arc<dyn Renderer>> {
    match config.renderer.engine {
        RenderEngine::Http => Ok(Arc::new(HttpRenderer::new(
            &config.renderer,
            &config.crawler,
        )?)),
        #[cfg(feature = "chrome")]
        RenderEngine::Chrome => {
            let ready_selector = crate::portal::profile(portal).ready_selector;
            Ok(Arc::new(crate::crawler::ChromeRenderer::launch(
                &config.renderer,
                &config.crawler,
                ready_selector,
            )?))
        }
        #[cfg(not(feature = "chrome"))]
        RenderEngine::Chrome => {
            let _ = portal;
            Err(crate::ConfigError::Validation(
                "renderer.engine = \"chrome\" requires the `chrome` feature".to_string(),
            )
            .into())
        }
    }
}

/// Runs the main crawl operation
///
/// This function orchestrates the entire crawl process:
///
/// 1. Resolve the portal and the search origins
/// 2. Open the database and start a run
/// 3. Build the renderer and the sinks
/// 4. Seed one request per origin
/// 5. Crawl until the queue is drained
/// 6. Mark the run as completed
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `config_hash` - Hash of the configuration file, stored with the run
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl completed; failures are counted in the report
/// * `Err(CrawlError)` - Setup failed before crawling
///
/// # Example
///
/// ```no_run
/// use listing_crawl::config::load_config_with_hash;
/// use listing_crawl::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("config.toml"))?;
/// let report = run_crawl(config, &hash).await?;
/// println!("{} listings", report.listings);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, config_hash: &str) -> crate::Result<CrawlReport> {
    let portal = config.search.portal()?;
    let origins = config.origins()?;

    let mut database = SqliteSink::open(Path::new(&config.output.database_path))?;
    let run_id = database.create_run(config_hash, portal)?;
    let database = Arc::new(database);
    tracing::info!("Starting crawl run {} on {}", run_id, portal);

    let mut sink = FanoutSink::new(vec![Arc::clone(&database) as Arc<dyn DatasetSink>]);
    if let Some(path) = &config.output.jsonl_path {
        sink.push(Arc::new(JsonLinesSink::open(Path::new(path))?));
        tracing::info!("Writing JSON lines to {}", path);
    }

    let renderer = match build_renderer(&config, portal) {
        Ok(renderer) => renderer,
        Err(e) => {
            database.finish_run(run_id, RunStatus::Failed)?;
            return Err(e);
        }
    };

    let mut crawler = Crawler::new(&config.crawler, renderer, Arc::new(sink));
    let seeded = match crawler.seed(origins) {
        Ok(seeded) => seeded,
        Err(e) => {
            database.finish_run(run_id, RunStatus::Failed)?;
            return Err(e);
        }
    };
    tracing::info!("Seeded {} searches", seeded);

    let mut report = crawler.run().await;
    report.run_id = Some(run_id);

    database.complete_run(run_id)?;

    tracing::info!(
        "Crawl completed: {} listings, {} failures in {:?}",
        report.listings,
        report.failures,
        report.elapsed
    );

    Ok(report)
}
