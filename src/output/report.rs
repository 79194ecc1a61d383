//! End-of-run crawl report

use crate::model::FailureKind;
use std::collections::HashMap;
use std::time::Duration;

/// What one crawl produced
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// Run ID in the database, when the crawl wrote to one
    pub run_id: Option<i64>,

    /// Origins whose first page was queued
    pub origins_seeded: u64,

    /// Page attempts that ran to an outcome
    pub pages_processed: u64,

    pub listings: u64,

    pub failures: u64,

    pub failures_by_kind: HashMap<FailureKind, u64>,

    /// Retry attempts queued
    pub retries: u64,

    /// Requests dropped because their identity was already seen
    pub duplicates: u64,

    /// Records the sink refused
    pub sink_errors: u64,

    pub elapsed: Duration,
}

impl CrawlReport {
    /// Failure count for one kind
    pub fn failures_of(&self, kind: FailureKind) -> u64 {
        self.failures_by_kind.get(&kind).copied().unwrap_or(0)
    }
}

/// Prints the report to stdout
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report ===\n");

    if let Some(run_id) = report.run_id {
        println!("  Run: {}", run_id);
    }
    println!("  Searches seeded: {}", report.origins_seeded);
    println!("  Pages processed: {}", report.pages_processed);
    println!("  Listings: {}", report.listings);
    println!("  Failures: {}", report.failures);
    println!("  Retries: {}", report.retries);
    println!("  Duplicates skipped: {}", report.duplicates);
    if report.sink_errors > 0 {
        println!("  Write errors: {}", report.sink_errors);
    }
    println!("  Elapsed: {:.1}s", report.elapsed.as_secs_f64());

    if !report.failures_by_kind.is_empty() {
        println!("\nFailures by kind:");
        for kind in FailureKind::all_kinds() {
            let count = report.failures_of(kind);
            if count > 0 {
                println!("  {}: {}", kind, count);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_of_missing_kind() {
        let mut report = CrawlReport::default();
        report.failures_by_kind.insert(FailureKind::HttpError, 2);
        assert_eq!(report.failures_of(FailureKind::HttpError), 2);
        assert_eq!(report.failures_of(FailureKind::StructuralMiss), 0);
    }
}
