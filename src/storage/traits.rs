//! Dataset sink trait and error types
//!
//! A sink receives the crawl's output: one call per extracted listing and one
//! per request that ended in failure. Sinks are shared across workers and must
//! accept concurrent appends.

use crate::model::{FailureRecord, ListingRecord};
use thiserror::Error;

/// Errors that can occur while writing to a sink
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Destination for crawl output
///
/// Appends carry no ordering guarantee across records.
pub trait DatasetSink: Send + Sync {
    /// Appends one extracted listing
    fn push_listing(&self, record: &ListingRecord) -> StorageResult<()>;

    /// Appends one failure record
    fn push_failure(&self, record: &FailureRecord) -> StorageResult<()>;

    /// Flushes buffered output
    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }
}
