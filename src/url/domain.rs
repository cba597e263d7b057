use url::Url;

/// Extracts the lowercase host from a URL, without the port
///
/// # Examples
///
/// ```
/// use url::Url;
/// use reqon_core::url::extract_host;
///
/// let url = Url::parse("https://Shop.Example.com:8443/cart").unwrap();
/// assert_eq!(extract_host(&url), Some("shop.example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
}

/// Returns true if both URLs point at the same host
///
/// Hosts compare case-insensitively; ports and schemes are ignored, so
/// `http://site:8080/` and `https://SITE/` count as the same origin here.
pub fn same_host(a: &Url, b: &Url) -> bool {
    match (extract_host(a), extract_host(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
