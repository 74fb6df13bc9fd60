use std::time::{Duration, Instant};

/// Per-domain politeness state, held in memory for the lifetime of a run
///
/// Robots rules live in the robots cache; this structure only carries what the
/// rate limiter needs to space requests.
#[derive(Debug, Clone, Default)]
pub struct DomainState {
    /// When the most recent request to this domain was released
    pub last_request_at: Option<Instant>,

    /// Crawl-delay declared by the domain's robots.txt, if any
    pub robots_delay: Option<Duration>,
}

impl DomainState {
    /// Creates a new DomainState with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective minimum gap between requests to this domain
    ///
    /// The larger of the configured default and the robots-declared delay.
    pub fn crawl_delay(&self, default_delay: Duration) -> Duration {
        match self.robots_delay {
            Some(robots) => default_delay.max(robots),
            None => default_delay,
        }
    }

    /// Time left before the next request may go out
    ///
    /// Returns `Duration::ZERO` if a request can be made now.
    pub fn time_until_next_request(&self, default_delay: Duration, now: Instant) -> Duration {
        match self.last_request_at {
            Some(last) => self
                .crawl_delay(default_delay)
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Records that a request was released at `now`
    pub fn record_request(&mut self, now: Instant) {
        self.last_request_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT: Duration = Duration::from_millis(1000);

    #[test]
    fn test_new_domain_state() {
        let state = DomainState::new();
        assert!(state.last_request_at.is_none());
        assert!(state.robots_delay.is_none());
    }

    #[test]
    fn test_can_request_initially() {
        let state = DomainState::new();
        assert_eq!(state.time_until_next_request(DEFAULT, Instant::now()), Duration::ZERO);
    }

    #[test]
    fn test_wait_after_request() {
        let mut state = DomainState::new();
        let now = Instant::now();
        state.record_request(now);

        let soon = now + Duration::from_millis(400);
        assert_eq!(
            state.time_until_next_request(DEFAULT, soon),
            Duration::from_millis(600)
        );

        let later = now + Duration::from_millis(1500);
        assert_eq!(state.time_until_next_request(DEFAULT, later), Duration::ZERO);
    }

    #[test]
    fn test_robots_delay_larger_than_default() {
        let state = DomainState {
            last_request_at: None,
            robots_delay: Some(Duration::from_secs(5)),
        };
        assert_eq!(state.crawl_delay(DEFAULT), Duration::from_secs(5));
    }

    #[test]
    fn test_robots_delay_smaller_than_default() {
        let state = DomainState {
            last_request_at: None,
            robots_delay: Some(Duration::from_millis(500)),
        };
        assert_eq!(state.crawl_delay(DEFAULT), DEFAULT);
    }
}
