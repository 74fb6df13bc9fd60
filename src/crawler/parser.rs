//! Link extraction collaborator
//!
//! # Link Extraction Rules
//!
//! **Include:**
//! - `<a href="...">` anywhere in the document
//! - `<link rel="canonical" href="...">`
//!
//! **Exclude:**
//! - `<a href="..." download>`
//! - `javascript:`, `mailto:`, `tel:` and `data:` links
//! - Fragment-only links (same page anchors)
//! - Anything that does not resolve to http(s)
//!
//! `rel="nofollow"` links are followed.

use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Pulls outgoing links from fetched page content
pub trait LinkExtractor: Send + Sync {
    /// Returns absolute URLs found in `html`, resolved against `base_url`
    fn extract_links(&self, html: &str, base_url: &str) -> Vec<String>;
}

/// [`LinkExtractor`] for HTML documents, built on scraper
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlLinkExtractor;

impl HtmlLinkExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl LinkExtractor for HtmlLinkExtractor {
    fn extract_links(&self, html: &str, base_url: &str) -> Vec<String> {
        match Url::parse(base_url) {
            Ok(base) => extract_links(&Html::parse_document(html), &base),
            Err(_) => Vec::new(),
        }
    }
}

/// Extracts all valid links from the document, first occurrence order
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();
    let mut push = |href: &str| {
        if let Some(absolute) = resolve_link(href, base_url) {
            if seen.insert(absolute.clone()) {
                links.push(absolute);
            }
        }
    };

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    links
}

/// Resolves a link href to an absolute http(s) URL
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute.to_string()),
        _ => None,
    }
}
