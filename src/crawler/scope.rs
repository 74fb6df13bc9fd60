//! Crawl-type scope rules
//!
//! | Crawl type     | Entries fetched           | Links enqueued                              |
//! |----------------|---------------------------|---------------------------------------------|
//! | `single_page`  | seeds only                | none                                        |
//! | `single_level` | seeds and depth 1         | from depth-0 pages, same domain as a seed   |
//! | `domain`       | seeds and seed domains    | any page on a seed's registrable domain     |
//!
//! Domains are compared by politeness key, so hosts without a public suffix
//! (`localhost`, intranet names) scope by their bare host.

use crate::config::CrawlType;
use crate::url::politeness_key;
use std::collections::HashSet;
use url::Url;

/// Decides which entries are fetched and which discovered links are kept
#[derive(Debug, Clone)]
pub struct CrawlScope {
    crawl_type: CrawlType,
    seed_domains: HashSet<String>,
}

impl CrawlScope {
    /// Builds the scope from the run's seed URLs
    ///
    /// Seeds that do not parse are still crawled; they just add nothing to the
    /// set of followed domains.
    pub fn new<I, S>(crawl_type: CrawlType, seeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let seed_domains = seeds
            .into_iter()
            .filter_map(|seed| scope_key(seed.as_ref()))
            .collect();

        Self {
            crawl_type,
            seed_domains,
        }
    }

    /// Whether a claimed entry should be fetched
    pub fn admits_entry(&self, url: &str, depth: u32) -> bool {
        if depth == 0 {
            return true;
        }
        match self.crawl_type {
            CrawlType::SinglePage => false,
            CrawlType::SingleLevel => depth == 1 && self.is_seed_domain(url),
            CrawlType::Domain => self.is_seed_domain(url),
        }
    }

    /// Whether links on a page at `depth` are worth extracting at all
    pub fn follows_links_from(&self, depth: u32) -> bool {
        match self.crawl_type {
            CrawlType::SinglePage => false,
            CrawlType::SingleLevel => depth == 0,
            CrawlType::Domain => true,
        }
    }

    /// Whether a link found on a page at `source_depth` should be enqueued
    pub fn admits_link(&self, source_depth: u32, link: &str) -> bool {
        self.follows_links_from(source_depth) && self.is_seed_domain(link)
    }

    fn is_seed_domain(&self, url: &str) -> bool {
        scope_key(url).is_some_and(|key| self.seed_domains.contains(&key))
    }
}

fn scope_key(url: &str) -> Option<String> {
    Url::parse(url).ok().and_then(|url| politeness_key(&url))
}
