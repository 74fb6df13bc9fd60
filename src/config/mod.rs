//! Configuration module for the crawl frontier
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use crawl_frontier::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Crawl type: {}", config.crawler.crawl_type);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlConfig, CrawlType, OutputConfig, RunConfig, DEFAULT_TRACKING_PARAMS,
};

// Re-export parser functions
pub use parser::{config_fingerprint, generate_run_id, load_config, sanitize_run_id};
pub use validation::validate_crawl_config;
