//! Statistics generation from the listings database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the SQLite sink.

use crate::model::FailureKind;
use crate::storage::{RunRecord, SqliteSink};
use std::collections::HashMap;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Most recent run, if any
    pub latest_run: Option<RunRecord>,

    /// Listings across all runs
    pub total_listings: u64,

    /// Failures across all runs
    pub total_failures: u64,

    /// Listings written by the latest run
    pub latest_listings: u64,

    /// Failures written by the latest run
    pub latest_failures: u64,

    /// Failure counts per kind for the latest run
    pub failure_summary: HashMap<FailureKind, u64>,

    /// Listing counts per neighborhood for the latest run, largest first
    pub by_neighborhood: Vec<(String, u64)>,
}

/// Loads statistics from the database
///
/// # Arguments
///
/// * `sink` - The SQLite sink to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(CrawlError)` - Failed to query statistics
pub fn load_statistics(sink: &SqliteSink) -> crate::Result<CrawlStatistics> {
    let latest_run = sink.get_latest_run()?;
    let run_id = latest_run.as_ref().map(|run| run.id);

    let (latest_listings, latest_failures) = match run_id {
        Some(id) => (sink.count_listings(Some(id))?, sink.count_failures(Some(id))?),
        None => (0, 0),
    };

    let (failure_summary, by_neighborhood) = match run_id {
        Some(id) => (
            sink.failure_summary(Some(id))?,
            sink.listings_by_neighborhood(Some(id))?,
        ),
        None => (HashMap::new(), Vec::new()),
    };

    Ok(CrawlStatistics {
        total_listings: sink.count_listings(None)?,
        total_failures: sink.count_failures(None)?,
        latest_run,
        latest_listings,
        latest_failures,
        failure_summary,
        by_neighborhood,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Total listings: {}", stats.total_listings);
    println!("  Total failures: {}", stats.total_failures);
    println!();

    let Some(run) = &stats.latest_run else {
        println!("No crawl runs found.");
        return;
    };

    println!("Latest run ({}):", run.id);
    println!("  Portal: {}", run.portal);
    println!("  Status: {}", run.status.to_db_string());
    println!("  Started: {}", run.started_at);
    if let Some(finished) = &run.finished_at {
        println!("  Finished: {}", finished);
    }
    println!("  Listings: {}", stats.latest_listings);
    println!("  Failures: {}", stats.latest_failures);
    println!();

    if !stats.by_neighborhood.is_empty() {
        println!("Listings by Neighborhood:");
        for (neighborhood, count) in &stats.by_neighborhood {
            println!("  {}: {}", neighborhood, count);
        }
        println!();
    }

    if !stats.failure_summary.is_empty() {
        println!("Failure Summary:");
        let mut failure_counts: Vec<_> = stats.failure_summary.iter().collect();
        failure_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (kind, count) in failure_counts {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    let attempted = stats.latest_listings + stats.latest_failures;
    if attempted > 0 {
        let failure_rate = stats.latest_failures as f64 / attempted as f64 * 100.0;
        println!(
            "Failure Rate: {:.1}% ({} failures / {} records)",
            failure_rate, stats.latest_failures, attempted
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FailureRecord, Portal};
    use crate::storage::DatasetSink;
    use chrono::Utc;

    #[test]
    fn test_statistics_without_runs() {
        let sink = SqliteSink::new_in_memory().unwrap();
        let stats = load_statistics(&sink).unwrap();
        assert!(stats.latest_run.is_none());
        assert_eq!(stats.total_listings, 0);
        print_statistics(&stats);
    }

    #[test]
    fn test_statistics_for_latest_run() {
        let mut sink = SqliteSink::new_in_memory().unwrap();
        sink.create_run("hash", Portal::ZapImoveis).unwrap();
        sink.push_failure(&FailureRecord {
            url: "https://www.zapimoveis.com.br/venda/".to_string(),
            kind: FailureKind::StructuralMiss,
            message: "No listing containers".to_string(),
            page: 1,
            retry_count: 0,
            portal: Portal::ZapImoveis,
            origin: "Barreiro".to_string(),
            failed_at: Utc::now(),
        })
        .unwrap();

        let stats = load_statistics(&sink).unwrap();
        assert_eq!(stats.latest_failures, 1);
        assert_eq!(stats.total_failures, 1);
        assert_eq!(
            stats.failure_summary.get(&FailureKind::StructuralMiss),
            Some(&1)
        );
    }
}
