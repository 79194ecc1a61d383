//! Output module for crawl reports and statistics
//!
//! This module handles:
//! - The report returned at the end of a crawl
//! - Statistics loaded from the listings database

mod report;
pub mod stats;

pub use report::{print_report, CrawlReport};
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
