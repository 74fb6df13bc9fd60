//! Robots.txt parser implementation
//!
//! Allow/Disallow matching is delegated to the robotstxt crate (Google's
//! matcher: longest match wins, ties go to Allow). Crawl-delay is not part of
//! that matcher, so it is parsed here.

use robotstxt::DefaultMatcher;
use std::time::Duration;

/// Parsed robots.txt data
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty string means allow all)
    content: String,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// Used for domains that answer `/robots.txt` with 404.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
        }
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `url` - The absolute URL (or path) to check
    /// * `user_agent` - The full user agent string; only its product token is matched
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, product_token(user_agent), url)
    }

    /// Gets the crawl delay for a specific user agent
    ///
    /// Only the groups naming the agent's product token apply, even when
    /// they declare no delay. The `*` group is used when no group names the
    /// agent, matching how Allow/Disallow rules are selected.
    ///
    /// # Returns
    ///
    /// * `Some(Duration)` - The declared crawl delay
    /// * `None` - If no applicable group declares one
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        let agent = product_token(user_agent).to_lowercase();

        let mut group_agents: Vec<String> = Vec::new();
        // A User-agent line after any rule starts a new group
        let mut in_rules = false;
        let mut agent_named = false;
        let mut delay_for_agent: Option<Duration> = None;
        let mut delay_for_wildcard: Option<Duration> = None;

        for line in self.content.lines() {
            let line = match line.split_once('#') {
                Some((before, _)) => before,
                None => line,
            }
            .trim();

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    if in_rules {
                        group_agents.clear();
                        in_rules = false;
                    }
                    let token = product_token(value).to_lowercase();
                    if !agent.is_empty() && token == agent {
                        agent_named = true;
                    }
                    group_agents.push(token);
                }
                "crawl-delay" => {
                    in_rules = true;
                    let Some(delay) = value
                        .parse::<f64>()
                        .ok()
                        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                    else {
                        continue;
                    };

                    if !agent.is_empty() && group_agents.iter().any(|ua| *ua == agent) {
                        delay_for_agent.get_or_insert(delay);
                    } else if group_agents.iter().any(|ua| ua == "*") {
                        delay_for_wildcard.get_or_insert(delay);
                    }
                }
                _ => in_rules = true,
            }
        }

        if agent_named {
            delay_for_agent
        } else {
            delay_for_wildcard
        }
    }
}

/// Reduces a user agent string to the token robots.txt groups are matched on
///
/// `"crawl-frontier/0.1 (+https://example.com)"` becomes `"crawl-frontier"`.
pub fn product_token(user_agent: &str) -> &str {
    let trimmed = user_agent.trim();
    if trimmed == "*" {
        return trimmed;
    }
    let end = trimmed
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(trimmed.len());
    &trimmed[..end]
}
