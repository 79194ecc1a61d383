//! Dedup frontier of pending page requests
//!
//! Every operation takes the queue lock once, so the dedup check and the
//! insert (or the pop and the in-flight mark) happen as one atomic step.

use crate::model::{CrawlRequest, FailureKind};
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Result of [`CrawlQueue::enqueue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued,
    /// A request with the same identity is pending or was already processed
    AlreadyQueued,
}

/// How a dequeued request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The page was handled (records, or an accepted empty page)
    Completed,
    /// The page failed with this kind
    Failed(FailureKind),
}

/// What the queue did with a reported outcome
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    Done,
    /// Re-queued as a new attempt
    Retried(CrawlRequest),
    /// Not retried; the caller must emit a failure record with this kind
    Terminal(FailureKind),
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<CrawlRequest>,
    seen: HashSet<String>,
    in_flight: HashSet<String>,
}

/// FIFO crawl frontier with identity dedup and bounded retries
#[derive(Debug)]
pub struct CrawlQueue {
    state: Mutex<QueueState>,
    max_retries: u32,
}

impl CrawlQueue {
    /// Creates an empty queue
    ///
    /// # Arguments
    ///
    /// * `max_retries` - Extra attempts allowed per request after a retryable failure
    pub fn new(max_retries: u32) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            max_retries,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds a request unless its identity was seen in this run
    pub fn enqueue(&self, request: CrawlRequest) -> EnqueueOutcome {
        let mut state = self.lock();
        if !state.seen.insert(request.identity().to_string()) {
            return EnqueueOutcome::AlreadyQueued;
        }
        state.pending.push_back(request);
        EnqueueOutcome::Queued
    }

    /// Takes the oldest pending request and marks it in flight
    pub fn dequeue(&self) -> Option<CrawlRequest> {
        let mut state = self.lock();
        let request = state.pending.pop_front()?;
        state.in_flight.insert(request.identity().to_string());
        Some(request)
    }

    /// Settles an in-flight request
    ///
    /// A retryable failure with budget left is re-queued as a new attempt
    /// (bypassing dedup, since its identity is already seen). A retryable
    /// failure at `max_retries` becomes [`FailureKind::RequestExhausted`].
    /// Any other failure is terminal with its own kind.
    pub fn report_outcome(&self, request: &CrawlRequest, outcome: RequestOutcome) -> Disposition {
        let mut state = self.lock();
        state.in_flight.remove(request.identity());

        match outcome {
            RequestOutcome::Completed => Disposition::Done,
            RequestOutcome::Failed(kind) if kind.is_retryable() => {
                if request.retry_count < self.max_retries {
                    let retry = request.retry();
                    state.pending.push_back(retry.clone());
                    Disposition::Retried(retry)
                } else {
                    Disposition::Terminal(FailureKind::RequestExhausted)
                }
            }
            RequestOutcome::Failed(kind) => Disposition::Terminal(kind),
        }
    }

    /// Number of requests waiting to be dequeued
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Number of requests dequeued but not yet settled
    pub fn in_flight_len(&self) -> usize {
        self.lock().in_flight.len()
    }

    /// True if `request` was dequeued and has not been settled yet
    pub fn is_in_flight(&self, request: &CrawlRequest) -> bool {
        self.lock().in_flight.contains(request.identity())
    }

    /// True when nothing is pending and nothing is in flight
    pub fn is_drained(&self) -> bool {
        let state = self.lock();
        state.pending.is_empty() && state.in_flight.is_empty()
    }

    /// Number of distinct identities seen in this run
    pub fn seen_len(&self) -> usize {
        self.lock().seen.len()
    }
}
