use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Query parameters stripped from every URL during normalization
pub const DEFAULT_TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
    "mc_cid",
    "msclkid",
    "_ga",
];

/// Main configuration file structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub run: RunConfig,
}

/// Which discovered links a run follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlType {
    /// Only the seeds are fetched
    SinglePage,
    /// Seeds plus the same-domain links found on them
    SingleLevel,
    /// Everything reachable on the seeds' registrable domains
    Domain,
}

impl fmt::Display for CrawlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SinglePage => "single_page",
            Self::SingleLevel => "single_level",
            Self::Domain => "domain",
        })
    }
}

/// Options for a single crawl run
///
/// Passed explicitly to [`crate::Frontier::start_run`]; nothing in the crate
/// reads run configuration from global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlConfig {
    #[serde(default = "default_crawl_type")]
    pub crawl_type: CrawlType,

    /// Stop once this many entries are resolved (complete or error)
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Maximum entries taken from the store per claim
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Maximum simultaneous in-flight fetches
    #[serde(default = "default_max_parallel")]
    pub max_parallel: u32,

    /// Failed attempts tolerated before an entry is permanently errored
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Page fetch timeout (seconds)
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: u64,

    #[serde(default = "default_true")]
    pub respect_robots: bool,

    #[serde(default = "default_true")]
    pub respect_rate_limits: bool,

    /// Minimum time between requests to the same domain (milliseconds)
    #[serde(default = "default_crawl_delay")]
    pub default_crawl_delay: u64,

    /// Treat an unreachable robots.txt as "no restrictions"
    #[serde(default = "default_true")]
    pub robots_fail_open: bool,

    /// robots.txt fetch timeout (seconds)
    #[serde(default = "default_robots_timeout")]
    pub robots_timeout: u64,

    /// How long a fetched robots.txt stays cached (seconds)
    #[serde(default = "default_robots_cache_ttl")]
    pub robots_cache_ttl: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_tracking_params")]
    pub tracking_params: Vec<String>,
}

impl CrawlConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }

    pub fn default_crawl_delay(&self) -> Duration {
        Duration::from_millis(self.default_crawl_delay)
    }

    pub fn robots_timeout(&self) -> Duration {
        Duration::from_secs(self.robots_timeout)
    }

    pub fn robots_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.robots_cache_ttl)
    }

    /// SHA-256 of this table, recorded on the run row
    pub fn fingerprint(&self) -> Result<String, crate::ConfigError> {
        super::config_fingerprint(self)
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            crawl_type: default_crawl_type(),
            max_pages: default_max_pages(),
            batch_size: default_batch_size(),
            max_parallel: default_max_parallel(),
            max_retries: default_max_retries(),
            fetch_timeout: default_fetch_timeout(),
            respect_robots: true,
            respect_rate_limits: true,
            default_crawl_delay: default_crawl_delay(),
            robots_fail_open: true,
            robots_timeout: default_robots_timeout(),
            robots_cache_ttl: default_robots_cache_ttl(),
            user_agent: default_user_agent(),
            tracking_params: default_tracking_params(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database file
    pub database_path: String,
}

/// Run identity and seeds
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunConfig {
    /// Reusing an id resumes that run
    pub run_id: Option<String>,

    #[serde(default)]
    pub seeds: Vec<String>,
}

fn default_crawl_type() -> CrawlType {
    CrawlType::SinglePage
}

fn default_max_pages() -> u32 {
    100
}

fn default_batch_size() -> u32 {
    10
}

fn default_max_parallel() -> u32 {
    4
}

fn default_max_retries() -> u32 {
    3
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_crawl_delay() -> u64 {
    1000
}

fn default_robots_timeout() -> u64 {
    10
}

fn default_robots_cache_ttl() -> u64 {
    3600
}

fn default_user_agent() -> String {
    format!("crawl-frontier/{}", env!("CARGO_PKG_VERSION"))
}

fn default_tracking_params() -> Vec<String> {
    DEFAULT_TRACKING_PARAMS.iter().map(|p| p.to_string()).collect()
}
