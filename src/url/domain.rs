use crate::UrlError;
use url::{Host, Url};

/// Derives the registrable domain of a URL
///
/// The registrable domain is the public suffix plus one label, so
/// `https://a.b.example.co.uk/x` yields `example.co.uk`. IP literal hosts have
/// no suffix and are returned unchanged so they still group for politeness.
///
/// # Examples
///
/// ```
/// use crawl_frontier::url::registrable_domain;
///
/// assert_eq!(registrable_domain("https://a.b.example.co.uk/x").unwrap(), "example.co.uk");
/// assert_eq!(registrable_domain("https://blog.example.com/").unwrap(), "example.com");
/// ```
pub fn registrable_domain(url: &str) -> Result<String, UrlError> {
    let parsed = Url::parse(url).map_err(|e| UrlError::Parse(format!("{}: {}", url, e)))?;
    registrable_domain_of(&parsed)
}

/// Same as [`registrable_domain`] for an already parsed URL
pub fn registrable_domain_of(url: &Url) -> Result<String, UrlError> {
    match url.host() {
        Some(Host::Domain(host)) => domain_for_host(host),
        Some(Host::Ipv4(ip)) => Ok(ip.to_string()),
        Some(Host::Ipv6(ip)) => Ok(ip.to_string()),
        None => Err(UrlError::MissingHost),
    }
}

fn domain_for_host(host: &str) -> Result<String, UrlError> {
    let host = host.trim_end_matches('.').to_lowercase();
    if host.is_empty() {
        return Err(UrlError::MissingHost);
    }

    match psl::domain(host.as_bytes()) {
        Some(domain) if domain.suffix().is_known() => {
            String::from_utf8(domain.as_bytes().to_vec())
                .map_err(|_| UrlError::UnknownSuffix(host.clone()))
        }
        _ => Err(UrlError::UnknownSuffix(host)),
    }
}
