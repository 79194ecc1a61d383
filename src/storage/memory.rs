//! In-memory dataset sink

use crate::model::{FailureRecord, ListingRecord};
use crate::storage::traits::{DatasetSink, StorageResult};
use std::sync::Mutex;

/// Keeps every record in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    listings: Mutex<Vec<ListingRecord>>,
    failures: Mutex<Vec<FailureRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the listings written so far
    pub fn listings(&self) -> Vec<ListingRecord> {
        self.listings
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Returns a copy of the failures written so far
    pub fn failures(&self) -> Vec<FailureRecord> {
        self.failures
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl DatasetSink for MemorySink {
    fn push_listing(&self, record: &ListingRecord) -> StorageResult<()> {
        if let Ok(mut listings) = self.listings.lock() {
            listings.push(record.clone());
        }
        Ok(())
    }

    fn push_failure(&self, record: &FailureRecord) -> StorageResult<()> {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push(record.clone());
        }
        Ok(())
    }
}
