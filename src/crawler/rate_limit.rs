//! Per-domain rate limiting
//!
//! Every domain gets its own async lock around its [`DomainState`]. A caller
//! holds that lock while it sleeps out the remaining delay and records the new
//! timestamp, so two workers on the same domain can never both pass within one
//! delay window. Unrelated domains never wait on each other.
//!
//! Robots crawl delays are kept outside those locks, so recording one never
//! waits behind a peer that is sleeping out its delay.

use crate::state::DomainState;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::trace;

type Slot = Arc<tokio::sync::Mutex<DomainState>>;

/// Spaces requests to the same domain by its effective crawl delay
pub struct RateLimiter {
    enabled: bool,
    default_delay: Duration,
    domains: Mutex<HashMap<String, Slot>>,
    robots_delays: Mutex<HashMap<String, Duration>>,
}

impl RateLimiter {
    /// Creates a limiter
    ///
    /// # Arguments
    ///
    /// * `enabled` - When false, [`RateLimiter::wait`] never blocks
    /// * `default_delay` - Minimum gap between requests to one domain
    pub fn new(enabled: bool, default_delay: Duration) -> Self {
        Self {
            enabled,
            default_delay,
            domains: Mutex::new(HashMap::new()),
            robots_delays: Mutex::new(HashMap::new()),
        }
    }

    /// Blocks until a request to `domain` is allowed, then claims that slot
    ///
    /// Returns how long the caller was delayed.
    pub async fn wait(&self, domain: &str) -> Duration {
        if !self.enabled {
            return Duration::ZERO;
        }

        let slot = self.slot(domain);
        let mut state = slot.lock().await;
        state.robots_delay = self.robots_delay(domain);

        let delay = state.time_until_next_request(self.default_delay, Instant::now());
        if !delay.is_zero() {
            trace!("Rate limiting {} for {:?}", domain, delay);
            tokio::time::sleep(delay).await;
        }

        state.record_request(Instant::now());
        delay
    }

    /// Records the crawl delay a domain's robots.txt declares
    ///
    /// Takes effect from the next [`RateLimiter::wait`] on `domain`. Returns
    /// true when the stored delay changed.
    pub fn set_crawl_delay(&self, domain: &str, delay: Option<Duration>) -> bool {
        let mut delays = self.robots_delays.lock().unwrap_or_else(PoisonError::into_inner);
        match delay {
            Some(delay) => delays.insert(domain.to_string(), delay) != Some(delay),
            None => delays.remove(domain).is_some(),
        }
    }

    fn robots_delay(&self, domain: &str) -> Option<Duration> {
        let delays = self.robots_delays.lock().unwrap_or_else(PoisonError::into_inner);
        delays.get(domain).copied()
    }

    fn slot(&self, domain: &str) -> Slot {
        let mut domains = self.domains.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(domains.entry(domain.to_string()).or_default())
    }
}
