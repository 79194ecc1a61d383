//! listing-crawl main entry point
//!
//! This is the command-line interface for the listing-crawl portal crawler.

use anyhow::Context;
use clap::Parser;
use listing_crawl::config::{load_config_with_hash, Config};
use listing_crawl::crawler::run_crawl;
use listing_crawl::output::{load_statistics, print_report, print_statistics};
use listing_crawl::storage::SqliteSink;
use listing_crawl::url::build_search_url;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// listing-crawl: a real-estate listing crawler
///
/// Crawls the search results of a listing portal neighborhood by neighborhood,
/// page by page, and stores every listing it can extract together with a
/// record of every page that failed.
#[derive(Parser, Debug)]
#[command(name = "listing-crawl")]
#[command(version = "1.0.0")]
#[command(about = "A real-estate listing crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and print every search URL without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_crawl=info,warn"),
            1 => EnvFilter::new("listing_crawl=debug,info"),
            2 => EnvFilter::new("listing_crawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== listing-crawl Dry Run ===\n");

    let crawler = &config.crawler;
    println!("Crawler Configuration:");
    println!("  Max concurrency: {}", crawler.max_concurrency);
    println!("  Max retries: {}", crawler.max_retries);
    println!("  Max pages per search: {}", crawler.max_pages_per_origin);
    println!(
        "  Timeouts: navigation {}s, content {}s, page {}s",
        crawler.navigation_timeout_secs,
        crawler.content_wait_timeout_secs,
        crawler.request_handler_timeout_secs
    );
    if let Some(size) = crawler.expected_page_size {
        println!("  Expected page size: {}", size);
    }

    println!("\nRenderer:");
    println!("  Engine: {:?}", config.renderer.engine);
    println!("  Proxy: {}", config.renderer.use_proxy);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    if let Some(path) = &config.output.jsonl_path {
        println!("  JSON lines: {}", path);
    }

    let origins = config.origins()?;
    println!(
        "\nSearches ({} on {}):",
        origins.len(),
        config.search.portal()?
    );
    for origin in &origins {
        let url = build_search_url(origin)
            .with_context(|| format!("Failed to build URL for {}", origin.label()))?;
        println!("  - {}", origin.label());
        println!("    * {}", url);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling {} searches", origins.len());

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let sink = SqliteSink::open(Path::new(&config.output.database_path))
        .context("Failed to open database")?;
    let stats = load_statistics(&sink)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str) -> anyhow::Result<()> {
    tracing::info!(
        "Portal: {}, neighborhoods: {}, seed URLs: {}",
        config.search.portal,
        config.search.neighborhoods.len(),
        config.search.seed_urls.len()
    );

    match run_crawl(config, config_hash).await {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
