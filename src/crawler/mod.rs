//! Crawler module for queue-driven listing crawls
//!
//! This module contains the core crawling logic, including:
//! - The dedup crawl queue with bounded retries
//! - Page renderers (plain HTTP, optional headless Chrome)
//! - Failure classification and block detection
//! - The pagination policy
//! - Worker scheduling and overall crawl coordination

#[cfg(feature = "chrome")]
mod chrome;
mod coordinator;
mod failure;
mod observer;
mod pagination;
mod queue;
mod renderer;
mod scheduler;

#[cfg(feature = "chrome")]
pub use chrome::ChromeRenderer;
pub use coordinator::{build_renderer, run_crawl, Crawler};
pub use failure::{classify, detect_block};
pub use observer::{CrawlEvent, CrawlObserver, RecordingObserver, TracingObserver};
pub use pagination::{PaginationDecision, PaginationPolicy, StopReason};
pub use queue::{CrawlQueue, Disposition, EnqueueOutcome, RequestOutcome};
pub use renderer::{build_http_client, HttpRenderer, RenderError, RenderedPage, Renderer};
pub use scheduler::{Scheduler, SchedulerSettings};
