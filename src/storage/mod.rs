//! Storage module for crawl output
//!
//! This module handles where extracted listings and failure records go:
//! - The `DatasetSink` trait the crawler writes through
//! - SQLite database with run tracking and statistics
//! - JSON-lines file output
//! - In-memory sink and fan-out to several sinks

mod jsonl;
mod memory;
mod schema;
mod sqlite;
mod traits;

pub use jsonl::JsonLinesSink;
pub use memory::MemorySink;
pub use sqlite::SqliteSink;
pub use traits::{DatasetSink, StorageError, StorageResult};

use crate::model::{FailureRecord, ListingRecord};
use std::sync::Arc;

/// Writes every record to each of its sinks in turn
///
/// The first error stops the fan-out for that record.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn DatasetSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn DatasetSink>>) -> Self {
        Self { sinks }
    }

    /// Adds another destination
    pub fn push(&mut self, sink: Arc<dyn DatasetSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl DatasetSink for FanoutSink {
    fn push_listing(&self, record: &ListingRecord) -> StorageResult<()> {
        for sink in &self.sinks {
            sink.push_listing(record)?;
        }
        Ok(())
    }

    fn push_failure(&self, record: &FailureRecord) -> StorageResult<()> {
        for sink in &self.sinks {
            sink.push_failure(record)?;
        }
        Ok(())
    }

    fn flush(&self) -> StorageResult<()> {
        for sink in &self.sinks {
            sink.flush()?;
        }
        Ok(())
    }
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub portal: String,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
