//! Structured crawl events
//!
//! The crawl core reports what happens through a [`CrawlObserver`] instead of
//! logging directly, so tests can assert on events without capturing output.

use crate::model::FailureKind;
use std::sync::Mutex;

/// Something notable that happened during a crawl
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlEvent {
    /// An origin's first page was queued
    Seeded { origin: String, url: String },

    /// A request was not queued because its identity was already seen
    Duplicate { url: String },

    PageStarted { url: String, page: u32, attempt: u32 },

    PageExtracted {
        url: String,
        page: u32,
        records: usize,
        containers: usize,
    },

    /// The container selectors matched nothing
    StructuralMiss { url: String, page: u32 },

    /// A card produced no record
    ContainerSkipped {
        url: String,
        index: usize,
        reason: String,
    },

    /// Some fields of a card resolved to nothing
    FieldsMissing {
        url: String,
        index: usize,
        fields: Vec<&'static str>,
    },

    /// The next page of an origin was queued
    Continuation { url: String, page: u32 },

    /// An origin will not be paginated further
    OriginFinished {
        origin: String,
        page: u32,
        reason: String,
    },

    /// A request failed retryably and was queued again
    Retrying {
        url: String,
        kind: FailureKind,
        retry_count: u32,
        rotate_identity: bool,
    },

    /// A request ended in a failure record
    Failed {
        url: String,
        kind: FailureKind,
        message: String,
    },
}

/// Receives crawl events
pub trait CrawlObserver: Send + Sync {
    fn on_event(&self, event: &CrawlEvent);
}

/// Turns events into `tracing` records
#[derive(Debug, Default)]
pub struct TracingObserver;

impl CrawlObserver for TracingObserver {
    fn on_event(&self, event: &CrawlEvent) {
        match event {
            CrawlEvent::Seeded { origin, url } => {
                tracing::info!(origin = %origin, "Queued search: {}", url)
            }
            CrawlEvent::Duplicate { url } => tracing::debug!("Already queued: {}", url),
            CrawlEvent::PageStarted { url, page, attempt } => {
                tracing::info!(page, attempt, "Processing {}", url)
            }
            CrawlEvent::PageExtracted {
                url,
                page,
                records,
                containers,
            } => tracing::info!(
                page,
                records,
                containers,
                "Found {} listings on page {}: {}",
                records,
                page,
                url
            ),
            CrawlEvent::StructuralMiss { url, page } => {
                tracing::warn!(page, "No listing containers on page {}: {}", page, url)
            }
            CrawlEvent::ContainerSkipped { url, index, reason } => {
                tracing::debug!(index, "Skipped card {} on {}: {}", index, url, reason)
            }
            CrawlEvent::FieldsMissing { url, index, fields } => {
                tracing::trace!(index, "Card {} on {} missing {:?}", index, url, fields)
            }
            CrawlEvent::Continuation { url, page } => {
                tracing::info!(page, "Queued page {}: {}", page, url)
            }
            CrawlEvent::OriginFinished {
                origin,
                page,
                reason,
            } => tracing::info!(origin = %origin, page, "Finished search: {}", reason),
            CrawlEvent::Retrying {
                url,
                kind,
                retry_count,
                rotate_identity,
            } => tracing::warn!(
                kind = %kind,
                retry_count,
                rotate_identity,
                "Retrying {}",
                url
            ),
            CrawlEvent::Failed { url, kind, message } => {
                tracing::error!(kind = %kind, "Failed {}: {}", url, message)
            }
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<CrawlEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the events seen so far
    pub fn events(&self) -> Vec<CrawlEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl CrawlObserver for RecordingObserver {
    fn on_event(&self, event: &CrawlEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
