//! URL handling module
//!
//! This module provides URL normalization and registrable-domain extraction,
//! the two pure functions every other component keys its state on.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{registrable_domain, registrable_domain_of};
pub use normalize::{normalize_url, normalize_url_with};

use ::url::Url;

/// Key used for per-domain politeness state
///
/// Prefers the registrable domain; hosts without a known public suffix
/// (`localhost`, intranet names) fall back to the bare host so they are still
/// rate limited on their own.
pub fn politeness_key(url: &Url) -> Option<String> {
    registrable_domain_of(url)
        .ok()
        .or_else(|| url.host_str().map(|h| h.to_lowercase()))
}
