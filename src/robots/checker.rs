//! Robots policy checker
//!
//! Answers allow/deny for a URL, fetching `/robots.txt` on cache miss. The
//! cache is keyed by registrable domain. Each domain has its own async lock,
//! so concurrent checks for one domain trigger a single fetch while other
//! domains proceed independently.

use crate::config::CrawlConfig;
use crate::robots::{CachedRobots, ParsedRobots};
use crate::url::politeness_key;
use crate::{FrontierError, Result, UrlError};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;
use url::Url;

type Slot = Arc<tokio::sync::Mutex<Option<CachedRobots>>>;

/// Outcome of a robots check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobotsVerdict {
    pub allowed: bool,
    /// Crawl-delay the domain declares for our agent
    pub crawl_delay: Option<Duration>,
}

impl RobotsVerdict {
    fn allow_all() -> Self {
        Self {
            allowed: true,
            crawl_delay: None,
        }
    }
}

/// Fetches, caches and evaluates robots.txt per registrable domain
pub struct RobotsChecker {
    client: Client,
    enabled: bool,
    cache_ttl: Duration,
    slots: Mutex<HashMap<String, Slot>>,
}

impl RobotsChecker {
    /// Creates a checker from the crawl configuration
    ///
    /// The HTTP client uses the configured user agent and robots timeout,
    /// which is independent of the page fetch timeout.
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.robots_timeout())
            .build()?;

        Ok(Self::with_client(
            client,
            config.respect_robots,
            config.robots_cache_ttl(),
        ))
    }

    pub fn with_client(client: Client, enabled: bool, cache_ttl: Duration) -> Self {
        Self {
            client,
            enabled,
            cache_ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Checks whether `url` may be fetched by `user_agent`
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Allowed, or robots handling is disabled
    /// * `Ok(false)` - Disallowed by the domain's robots.txt
    /// * `Err(FrontierError::RobotsFetch)` - robots.txt could not be retrieved
    pub async fn is_allowed(&self, url: &str, user_agent: &str) -> Result<bool> {
        if !self.enabled {
            return Ok(true);
        }
        let url = Url::parse(url).map_err(|e| UrlError::Parse(e.to_string()))?;
        Ok(self.check(&url, user_agent).await?.allowed)
    }

    /// Full verdict for `url`, including the declared crawl delay
    pub async fn check(&self, url: &Url, user_agent: &str) -> Result<RobotsVerdict> {
        self.evaluate(url, user_agent, false).await
    }

    /// Same as [`RobotsChecker::check`], but a cached fetch failure is fetched
    /// again instead of being reused
    ///
    /// Cached rules are still reused until they expire.
    pub async fn recheck(&self, url: &Url, user_agent: &str) -> Result<RobotsVerdict> {
        self.evaluate(url, user_agent, true).await
    }

    async fn evaluate(
        &self,
        url: &Url,
        user_agent: &str,
        refetch_failure: bool,
    ) -> Result<RobotsVerdict> {
        if !self.enabled {
            return Ok(RobotsVerdict::allow_all());
        }

        let domain = politeness_key(url).ok_or(UrlError::MissingHost)?;
        let slot = self.slot(&domain);
        let mut cached = slot.lock().await;

        let fresh = cached
            .as_ref()
            .is_some_and(|entry| !entry.is_stale() && !(refetch_failure && entry.is_failure()));
        if !fresh {
            *cached = Some(self.fetch(url).await);
        }

        match cached.as_ref().map(|entry| &entry.content) {
            Some(Ok(rules)) => Ok(RobotsVerdict {
                allowed: rules.is_allowed(url.as_str(), user_agent),
                crawl_delay: rules.crawl_delay(user_agent),
            }),
            Some(Err(message)) => Err(FrontierError::RobotsFetch {
                domain,
                message: message.clone(),
            }),
            None => Ok(RobotsVerdict::allow_all()),
        }
    }

    fn slot(&self, domain: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(domain.to_string()).or_default())
    }

    async fn fetch(&self, url: &Url) -> CachedRobots {
        match self.fetch_rules(url).await {
            Ok(rules) => CachedRobots::new(rules, self.cache_ttl),
            Err(message) => CachedRobots::failed(message, self.cache_ttl),
        }
    }

    async fn fetch_rules(&self, url: &Url) -> std::result::Result<ParsedRobots, String> {
        let robots_url = url.join("/robots.txt").map_err(|e| e.to_string())?;
        debug!("Fetching {}", robots_url);

        let response = self
            .client
            .get(robots_url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(ParsedRobots::allow_all());
        }
        if !status.is_success() {
            return Err(format!("robots.txt returned HTTP {}", status.as_u16()));
        }

        let body = response.text().await.map_err(|e| e.to_string())?;
        Ok(ParsedRobots::from_content(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const AGENT: &str = "TestBot/1.0";

    fn checker(enabled: bool) -> RobotsChecker {
        RobotsChecker::with_client(Client::new(), enabled, Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn test_disabled_allows_without_network() {
        // Port 9 is discard; nothing is contacted when disabled
        let allowed = checker(false)
            .is_allowed("http://127.0.0.1:9/private", AGENT)
            .await
            .unwrap();
        assert!(allowed);
    }

    #[tokio::test]
    async fn test_disallowed_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("User-agent: *\nDisallow: /private\nCrawl-delay: 2"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let checker = checker(true);
        let blocked = Url::parse(&format!("{}/private/page", server.uri())).unwrap();
        let open = Url::parse(&format!("{}/public", server.uri())).unwrap();

        let verdict = checker.check(&blocked, AGENT).await.unwrap();
        assert!(!verdict.allowed);
        assert_eq!(verdict.crawl_delay, Some(Duration::from_secs(2)));

        // Served from cache; the mock expects exactly one request
        assert!(checker.check(&open, AGENT).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_not_found_allows_all() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let allowed = checker(true)
            .is_allowed(&format!("{}/anything", server.uri()), AGENT)
            .await
            .unwrap();
        assert!(allowed);
    }

    #[tokio::test]
    async fn test_server_error_is_robots_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let checker = checker(true);
        let url = format!("{}/page", server.uri());

        let err = checker.is_allowed(&url, AGENT).await.unwrap_err();
        assert!(matches!(err, FrontierError::RobotsFetch { .. }));

        // The failure is cached as well
        assert!(checker.is_allowed(&url, AGENT).await.is_err());
    }

    #[tokio::test]
    async fn test_recheck_refetches_cached_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /x"))
            .expect(1)
            .mount(&server)
            .await;

        let checker = checker(true);
        let url = Url::parse(&format!("{}/page", server.uri())).unwrap();

        assert!(checker.check(&url, AGENT).await.is_err());
        // Served from the cached failure
        assert!(checker.check(&url, AGENT).await.is_err());
        assert!(checker.recheck(&url, AGENT).await.is_err());

        let verdict = checker.recheck(&url, AGENT).await.unwrap();
        assert!(verdict.allowed);

        // Rules are cached again; no further request
        assert!(checker.recheck(&url, AGENT).await.unwrap().allowed);
    }
}
