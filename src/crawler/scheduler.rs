//! Worker pool that drains the crawl queue
//!
//! This module handles:
//! - Dispatching queued requests to a bounded number of concurrent workers
//! - Bounding each page (render plus extraction) by the request handler timeout
//! - Backing off before retries
//! - Routing each outcome to the sink, the pagination policy or the queue's
//!   retry logic

use crate::config::CrawlerConfig;
use crate::crawler::failure::{classify, detect_block};
use crate::crawler::observer::{CrawlEvent, CrawlObserver};
use crate::crawler::pagination::{PaginationDecision, PaginationPolicy, StopReason};
use crate::crawler::queue::{CrawlQueue, Disposition, EnqueueOutcome, RequestOutcome};
use crate::crawler::renderer::Renderer;
use crate::extract::{extract_page, CompiledProfile, PageExtraction};
use crate::model::{CrawlRequest, FailureKind, FailureRecord, Portal};
use crate::output::CrawlReport;
use crate::portal;
use crate::storage::DatasetSink;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::{self, JoinError, JoinSet};

/// Scheduling knobs taken from `[crawler]`
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub max_concurrency: usize,
    pub max_pages: u32,
    pub request_handler_timeout: Duration,
    pub retry_backoff: Duration,
    pub min_content_length: usize,
    pub min_expected_records: Option<u32>,
    pub expected_page_size: Option<u32>,
}

impl From<&CrawlerConfig> for SchedulerSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency.max(1) as usize,
            max_pages: config.max_pages_per_origin,
            request_handler_timeout: config.request_handler_timeout(),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            min_content_length: config.min_content_length,
            min_expected_records: config.min_expected_records,
            expected_page_size: config.expected_page_size,
        }
    }
}

/// Per-portal extraction state
struct PortalRuntime {
    profile: CompiledProfile,
    pagination: PaginationPolicy,
}

#[derive(Default)]
struct RunCounters {
    pages_processed: AtomicU64,
    listings: AtomicU64,
    failures: AtomicU64,
    retries: AtomicU64,
    duplicates: AtomicU64,
    sink_errors: AtomicU64,
    failures_by_kind: Mutex<HashMap<FailureKind, u64>>,
}

/// State shared by every worker
struct Shared {
    queue: CrawlQueue,
    renderer: Arc<dyn Renderer>,
    sink: Arc<dyn DatasetSink>,
    observer: Arc<dyn CrawlObserver>,
    portals: HashMap<Portal, PortalRuntime>,
    settings: SchedulerSettings,
    counters: RunCounters,
}

/// How one attempt at a page went
enum PageResult {
    Extracted(PageExtraction),
    Failed { kind: FailureKind, message: String },
}

/// Drains a [`CrawlQueue`] with a bounded worker pool
pub struct Scheduler {
    shared: Arc<Shared>,
}

impl Scheduler {
    /// Creates a scheduler over an empty queue
    ///
    /// # Arguments
    ///
    /// * `config` - Concurrency, retry, timeout and pagination settings
    /// * `renderer` - Turns request URLs into rendered pages
    /// * `sink` - Receives listings and failure records
    /// * `observer` - Receives crawl events
    pub fn new(
        config: &CrawlerConfig,
        renderer: Arc<dyn Renderer>,
        sink: Arc<dyn DatasetSink>,
        observer: Arc<dyn CrawlObserver>,
    ) -> Self {
        let settings = SchedulerSettings::from(config);

        let portals = Portal::all()
            .into_iter()
            .map(|portal| {
                let profile = portal::profile(portal);
                let runtime = PortalRuntime {
                    profile: CompiledProfile::compile(profile),
                    pagination: PaginationPolicy::new(
                        profile,
                        settings.max_pages,
                        settings.expected_page_size,
                    ),
                };
                (portal, runtime)
            })
            .collect();

        Self {
            shared: Arc::new(Shared {
                queue: CrawlQueue::new(config.max_retries),
                renderer,
                sink,
                observer,
                portals,
                settings,
                counters: RunCounters::default(),
            }),
        }
    }

    /// The queue this scheduler drains
    pub fn queue(&self) -> &CrawlQueue {
        &self.shared.queue
    }

    pub fn observer(&self) -> &Arc<dyn CrawlObserver> {
        &self.shared.observer
    }

    /// Notes a request dropped at seeding time as a duplicate
    pub fn record_duplicate(&self) {
        self.shared.counters.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    /// Runs workers until the queue is drained
    ///
    /// Returns once nothing is pending and nothing is in flight. Every request
    /// ends either completed or as exactly one failure record.
    pub async fn run(&self) -> CrawlReport {
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.shared.settings.max_concurrency));
        let mut workers = JoinSet::new();
        let mut running: HashMap<task::Id, CrawlRequest> = HashMap::new();

        tracing::info!(
            "Starting {} workers with the {} renderer",
            self.shared.settings.max_concurrency,
            self.shared.renderer.name()
        );

        loop {
            while let Ok(permit) = Arc::clone(&semaphore).try_acquire_owned() {
                let Some(request) = self.shared.queue.dequeue() else {
                    break;
                };

                let shared = Arc::clone(&self.shared);
                let handle = workers.spawn({
                    let request = request.clone();
                    async move {
                        let _permit = permit;
                        process_request(&shared, request).await;
                    }
                });
                running.insert(handle.id(), request);
            }

            match workers.join_next_with_id().await {
                Some(Ok((id, ()))) => {
                    running.remove(&id);
                }
                Some(Err(e)) => {
                    tracing::error!("Page worker failed: {}", e);
                    if let Some(request) = running.remove(&e.id()) {
                        settle_crashed(&self.shared, &request, &e);
                    }
                }
                None => break,
            }
        }

        if let Err(e) = self.shared.sink.flush() {
            tracing::error!("Failed to flush output: {}", e);
        }
        tracing::debug!("Queue drained, {} distinct pages seen", self.shared.queue.seen_len());

        self.report(started.elapsed())
    }

    fn report(&self, elapsed: Duration) -> CrawlReport {
        let counters = &self.shared.counters;
        let failures_by_kind = counters
            .failures_by_kind
            .lock()
            .map(|kinds| kinds.clone())
            .unwrap_or_default();

        CrawlReport {
            run_id: None,
            origins_seeded: 0,
            pages_processed: counters.pages_processed.load(Ordering::Relaxed),
            listings: counters.listings.load(Ordering::Relaxed),
            failures: counters.failures.load(Ordering::Relaxed),
            failures_by_kind,
            retries: counters.retries.load(Ordering::Relaxed),
            duplicates: counters.duplicates.load(Ordering::Relaxed),
            sink_errors: counters.sink_errors.load(Ordering::Relaxed),
            elapsed,
        }
    }
}

/// Handles one dequeued request to its settled outcome
async fn process_request(shared: &Shared, request: CrawlRequest) {
    let url = request.url.to_string();
    shared.observer.on_event(&CrawlEvent::PageStarted {
        url: url.clone(),
        page: request.page,
        attempt: request.retry_count + 1,
    });

    if request.retry_count > 0 {
        tokio::time::sleep(shared.settings.retry_backoff * request.retry_count).await;
    }

    let timeout = shared.settings.request_handler_timeout;
    let result = match tokio::time::timeout(timeout, handle_page(shared, &request)).await {
        Ok(result) => result,
        Err(_) => PageResult::Failed {
            kind: FailureKind::NavigationTimeout,
            message: format!("Page handling exceeded {:?}", timeout),
        },
    };

    shared.counters.pages_processed.fetch_add(1, Ordering::Relaxed);

    match result {
        PageResult::Extracted(extraction) => settle_extracted(shared, &request, extraction),
        PageResult::Failed { kind, message } => settle_failed(shared, &request, kind, message),
    }
}

/// Renders and extracts one page
async fn handle_page(shared: &Shared, request: &CrawlRequest) -> PageResult {
    let Some(runtime) = shared.portals.get(&request.origin.portal) else {
        return PageResult::Failed {
            kind: FailureKind::UnsupportedPortal,
            message: format!("No profile for {}", request.origin.portal),
        };
    };

    let page = match shared.renderer.render(&request.url).await {
        Ok(page) => page,
        Err(e) => {
            return PageResult::Failed {
                kind: classify(&e),
                message: e.to_string(),
            }
        }
    };

    let extraction = extract_page(&page, &runtime.profile, request);

    if let Some(reason) = detect_block(
        &page,
        runtime.profile.profile,
        extraction.container_count,
        shared.settings.min_content_length,
    ) {
        return PageResult::Failed {
            kind: FailureKind::BlockedOrDenied,
            message: reason,
        };
    }

    PageResult::Extracted(extraction)
}

fn settle_extracted(shared: &Shared, request: &CrawlRequest, extraction: PageExtraction) {
    let url = request.url.to_string();
    let records = extraction.records.len();

    shared.observer.on_event(&CrawlEvent::PageExtracted {
        url: url.clone(),
        page: request.page,
        records,
        containers: extraction.container_count,
    });

    for skipped in &extraction.skipped {
        shared.observer.on_event(&CrawlEvent::ContainerSkipped {
            url: url.clone(),
            index: skipped.index,
            reason: format!("{:?}", skipped.reason),
        });
    }
    for miss in &extraction.field_misses {
        shared.observer.on_event(&CrawlEvent::FieldsMissing {
            url: url.clone(),
            index: miss.index,
            fields: miss.fields.clone(),
        });
    }

    for record in &extraction.records {
        match shared.sink.push_listing(record) {
            Ok(()) => {
                shared.counters.listings.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                shared.counters.sink_errors.fetch_add(1, Ordering::Relaxed);
                tracing::error!("Failed to write listing {}: {}", record.url, e);
            }
        }
    }

    if extraction.is_structural_miss() {
        shared.observer.on_event(&CrawlEvent::StructuralMiss {
            url: url.clone(),
            page: request.page,
        });
    }

    if records == 0 && request.page == 1 {
        let message = if extraction.is_structural_miss() {
            "No listing containers on the first page".to_string()
        } else {
            format!(
                "No listings extracted from {} containers on the first page",
                extraction.container_count
            )
        };
        finish_origin(shared, request, StopReason::EmptyPage);
        settle_failed(shared, request, FailureKind::StructuralMiss, message);
        return;
    }

    if let Some(minimum) = shared.settings.min_expected_records {
        if (records as u64) < u64::from(minimum) && records > 0 {
            let message = format!("Only {} listings, expected at least {}", records, minimum);
            finish_origin(shared, request, StopReason::ShortPage);
            settle_failed(shared, request, FailureKind::StructuralMiss, message);
            return;
        }
    }

    paginate(shared, request, &extraction);
    shared.queue.report_outcome(request, RequestOutcome::Completed);
}

/// Queues the next page of the request's origin, if any
fn paginate(shared: &Shared, request: &CrawlRequest, extraction: &PageExtraction) {
    let Some(runtime) = shared.portals.get(&request.origin.portal) else {
        return;
    };

    let decision = runtime.pagination.next(
        request,
        extraction.records.len(),
        extraction.container_count,
        &extraction.next_control,
    );

    match decision {
        Ok(PaginationDecision::Continue(next)) => {
            let next_url = next.url.to_string();
            let page = next.page;
            match shared.queue.enqueue(next) {
                EnqueueOutcome::Queued => {
                    shared.observer.on_event(&CrawlEvent::Continuation {
                        url: next_url,
                        page,
                    });
                }
                EnqueueOutcome::AlreadyQueued => {
                    shared.counters.duplicates.fetch_add(1, Ordering::Relaxed);
                    shared.observer.on_event(&CrawlEvent::Duplicate { url: next_url });
                }
            }
        }
        Ok(PaginationDecision::Stop(reason)) => finish_origin(shared, request, reason),
        Err(e) => {
            tracing::warn!("Could not build the next page of {}: {}", request.url, e);
            shared.observer.on_event(&CrawlEvent::OriginFinished {
                origin: request.origin.label(),
                page: request.page,
                reason: e.to_string(),
            });
        }
    }
}

fn finish_origin(shared: &Shared, request: &CrawlRequest, reason: StopReason) {
    shared.observer.on_event(&CrawlEvent::OriginFinished {
        origin: request.origin.label(),
        page: request.page,
        reason: reason.to_string(),
    });
}

/// Settles a request whose worker panicked or was cancelled
///
/// Does nothing if the worker had already settled it.
fn settle_crashed(shared: &Shared, request: &CrawlRequest, error: &JoinError) {
    if !shared.queue.is_in_flight(request) {
        return;
    }
    let message = if error.is_panic() {
        "Page worker panicked".to_string()
    } else {
        "Page worker was cancelled".to_string()
    };
    settle_failed(shared, request, FailureKind::NavigationError, message);
}

/// Routes a failed attempt through the queue's retry logic
fn settle_failed(shared: &Shared, request: &CrawlRequest, kind: FailureKind, message: String) {
    match shared.queue.report_outcome(request, RequestOutcome::Failed(kind)) {
        Disposition::Done => {}
        Disposition::Retried(retry) => {
            shared.counters.retries.fetch_add(1, Ordering::Relaxed);
            shared.observer.on_event(&CrawlEvent::Retrying {
                url: retry.url.to_string(),
                kind,
                retry_count: retry.retry_count,
                rotate_identity: kind.wants_identity_rotation(),
            });
        }
        Disposition::Terminal(final_kind) => {
            let message = if final_kind == FailureKind::RequestExhausted {
                format!(
                    "Gave up after {} attempts, last error ({}): {}",
                    request.retry_count + 1,
                    kind,
                    message
                )
            } else {
                message
            };
            emit_failure(shared, FailureRecord::for_request(request, final_kind, message));
        }
    }
}

fn emit_failure(shared: &Shared, record: FailureRecord) {
    shared.observer.on_event(&CrawlEvent::Failed {
        url: record.url.clone(),
        kind: record.kind,
        message: record.message.clone(),
    });

    if let Err(e) = shared.sink.push_failure(&record) {
        shared.counters.sink_errors.fetch_add(1, Ordering::Relaxed);
        tracing::error!("Failed to write failure record for {}: {}", record.url, e);
        return;
    }

    shared.counters.failures.fetch_add(1, Ordering::Relaxed);
    if let Ok(mut kinds) = shared.counters.failures_by_kind.lock() {
        *kinds.entry(record.kind).or_insert(0) += 1;
    }
}
