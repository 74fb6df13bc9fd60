//! Robots.txt cache entries
//!
//! A fetch outcome is cached together with the moment it was taken. Failed
//! fetches are cached too, with a shorter lifetime, so an unreachable host is
//! not asked again for every URL.

use crate::robots::ParsedRobots;
use std::time::{Duration, Instant};

/// How long a failed robots.txt fetch is remembered
pub const FAILURE_TTL: Duration = Duration::from_secs(300);

/// Cached robots.txt outcome for a domain
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// Parsed rules, or the reason robots.txt could not be fetched
    pub content: Result<ParsedRobots, String>,

    /// When the robots.txt was fetched
    pub fetched_at: Instant,

    ttl: Duration,
}

impl CachedRobots {
    /// Caches successfully fetched rules for `ttl`
    pub fn new(content: ParsedRobots, ttl: Duration) -> Self {
        Self {
            content: Ok(content),
            fetched_at: Instant::now(),
            ttl,
        }
    }

    /// Caches a fetch failure for [`FAILURE_TTL`], or `ttl` if that is shorter
    pub fn failed(message: impl Into<String>, ttl: Duration) -> Self {
        Self {
            content: Err(message.into()),
            fetched_at: Instant::now(),
            ttl: ttl.min(FAILURE_TTL),
        }
    }

    /// Checks if the entry has outlived its TTL
    pub fn is_stale(&self) -> bool {
        self.age() >= self.ttl
    }

    /// True when this entry records a failed fetch
    pub fn is_failure(&self) -> bool {
        self.content.is_err()
    }

    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }
}
