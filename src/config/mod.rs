//! Configuration module for listing-crawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use listing_crawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Crawling up to {} pages per origin", config.crawler.max_pages_per_origin);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, CrawlerConfig, OutputConfig, RenderEngine, RendererConfig, SearchConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
