//! Crawler module: the frontier scheduler and its collaborators
//!
//! This module contains:
//! - The page fetching seam and its HTTP backend
//! - HTML link extraction
//! - Per-domain rate limiting
//! - Crawl-type scope rules
//! - The run coordinator that ties them to the store

mod coordinator;
mod fetcher;
mod parser;
mod rate_limit;
mod scope;

pub use coordinator::{Frontier, RunReport, StopReason};
pub use fetcher::{FetchBackend, FetchedPage, HttpFetcher, PageFetcher};
pub use parser::{HtmlLinkExtractor, LinkExtractor};
pub use rate_limit::RateLimiter;
pub use scope::CrawlScope;
