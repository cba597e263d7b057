use crate::UrlError;
use url::Url;

/// Normalizes a URL into the form used for deduplication
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not http or https
/// 3. Lowercase the host (done by the parser) and require one
/// 4. Drop the fragment
/// 5. Strip trailing slashes from the path
/// 6. Keep the explicit port and the query string untouched
///
/// The result is `scheme://host[:port]path[?query]`. The root of a site
/// normalizes to `scheme://host` without a slash.
///
/// # Examples
///
/// ```
/// use reqon_core::url::normalize_url;
///
/// let a = normalize_url("https://Example.com/docs/#intro").unwrap();
/// let b = normalize_url("https://example.com/docs").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a, "https://example.com/docs");
/// ```
pub fn normalize_url(url_str: &str) -> Result<String, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(&url)
}

/// Normalizes an already parsed URL; see [`normalize_url`]
pub fn normalize_parsed(url: &Url) -> Result<String, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = match url.host_str() {
        Some(h) if !h.is_empty() => h,
        _ => return Err(UrlError::MissingHost),
    };

    let mut normalized = format!("{}://{}", url.scheme(), host);

    // `port()` is None for the scheme's default port
    if let Some(port) = url.port() {
        normalized.push(':');
        normalized.push_str(&port.to_string());
    }

    normalized.push_str(url.path().trim_end_matches('/'));

    if let Some(query) = url.query() {
        if !query.is_empty() {
            normalized.push('?');
            normalized.push_str(query);
        }
    }

    Ok(normalized)
}
