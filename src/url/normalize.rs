use crate::config::DEFAULT_TRACKING_PARAMS;
use crate::UrlError;
use url::form_urlencoded;
use url::Url;

/// Normalizes a URL using the default tracking parameter list
///
/// See [`normalize_url_with`] for the rules applied.
///
/// # Examples
///
/// ```
/// use crawl_frontier::url::normalize_url;
///
/// let a = normalize_url("https://Example.com:443/a/").unwrap();
/// let b = normalize_url("https://example.com/a").unwrap();
/// assert_eq!(a, b);
/// ```
pub fn normalize_url(raw: &str) -> Result<String, UrlError> {
    normalize(raw, |key| {
        DEFAULT_TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
    })
}

/// Normalizes a URL into its canonical, de-duplicatable form
///
/// # Normalization Steps
///
/// 1. Parse as an absolute URL; reject if malformed
/// 2. Reject any scheme other than http/https
/// 3. Lowercase scheme and host, drop default ports (80/443)
/// 4. Resolve dot segments and drop a trailing slash (the bare root `/` is kept)
/// 5. Remove the fragment
/// 6. Remove tracking query parameters, leaving the rest in their original order
/// 7. Remove an empty query string
///
/// The function is pure and safe to call from any number of tasks.
pub fn normalize_url_with(raw: &str, tracking_params: &[String]) -> Result<String, UrlError> {
    normalize(raw, |key| {
        key.starts_with("utm_") || tracking_params.iter().any(|p| p == key)
    })
}

fn normalize(raw: &str, is_tracking: impl Fn(&str) -> bool) -> Result<String, UrlError> {
    // The url crate already lowercases scheme/host, strips default ports and
    // resolves dot segments while parsing.
    let mut url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(UrlError::MissingHost),
    }

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        let trimmed = if trimmed.is_empty() { "/" } else { trimmed }.to_string();
        url.set_path(&trimmed);
    }

    url.set_fragment(None);

    if let Some(query) = url.query() {
        let kept = filter_query(query, &is_tracking);
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&kept));
        }
    }

    Ok(url.to_string())
}

/// Drops tracking parameters from a raw query string without re-encoding the rest
fn filter_query(query: &str, is_tracking: &impl Fn(&str) -> bool) -> String {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = form_urlencoded::parse(pair.as_bytes())
                .next()
                .map(|(k, _)| k.into_owned())
                .unwrap_or_default();
            !is_tracking(&key)
        })
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_and_case_equivalence() {
        let a = normalize_url("https://Example.com:443/a/").unwrap();
        let b = normalize_url("https://example.com/a").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "https://example.com/a");
    }

    #[test]
    fn test_http_default_port_removed() {
        let result = normalize_url("HTTP://EXAMPLE.COM:80/Page").unwrap();
        assert_eq!(result, "http://example.com/Page");
    }

    #[test]
    fn test_non_default_port_kept() {
        let result = normalize_url("https://example.com:8443/").unwrap();
        assert_eq!(result, "https://example.com:8443/");
    }

    #[test]
    fn test_keep_root_slash() {
        assert_eq!(normalize_url("https://example.com/").unwrap(), "https://example.com/");
        assert_eq!(normalize_url("https://example.com").unwrap(), "https://example.com/");
    }

    #[test]
    fn test_remove_trailing_slash() {
        let result = normalize_url("https://example.com/docs/guide/").unwrap();
        assert_eq!(result, "https://example.com/docs/guide");
    }

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("https://example.com/page#section").unwrap();
        assert_eq!(result, "https://example.com/page");
    }

    #[test]
    fn test_query_order_preserved() {
        let result = normalize_url("https://example.com/page?b=2&a=1").unwrap();
        assert_eq!(result, "https://example.com/page?b=2&a=1");
    }

    #[test]
    fn test_tracking_params_removed() {
        let result = normalize_url(
            "https://example.com/page?keep=yes&utm_medium=email&another=value&fbclid=123",
        )
        .unwrap();
        assert_eq!(result, "https://example.com/page?keep=yes&another=value");
    }

    #[test]
    fn test_all_tracking_params_removed_drops_query() {
        let result = normalize_url("https://example.com/page?utm_source=a&gclid=c").unwrap();
        assert_eq!(result, "https://example.com/page");
    }

    #[test]
    fn test_custom_tracking_list() {
        let params = vec!["session".to_string()];
        let result =
            normalize_url_with("https://example.com/p?session=9&fbclid=1&q=x", &params).unwrap();
        // fbclid is not in the custom list; utm_* is always stripped
        assert_eq!(result, "https://example.com/p?fbclid=1&q=x");
    }

    #[test]
    fn test_dot_segments_resolved() {
        let result = normalize_url("https://example.com/a/../b/./c").unwrap();
        assert_eq!(result, "https://example.com/b/c");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://example.com/page");
        assert!(matches!(result, Err(UrlError::InvalidScheme(_))));
    }

    #[test]
    fn test_relative_url_rejected() {
        assert!(matches!(normalize_url("/just/a/path"), Err(UrlError::Parse(_))));
        assert!(normalize_url("not a url").is_err());
    }

    #[test]
    fn test_mailto_rejected() {
        assert!(normalize_url("mailto:someone@example.com").is_err());
    }
}
