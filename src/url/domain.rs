use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_mirror::url::extract_host;
///
/// let url = Url::parse("https://EXAMPLE.COM:8443/path").unwrap();
/// assert_eq!(extract_host(&url), Some("example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the robots.txt origin of a URL: `scheme://host[:port]`
///
/// The port is only included when it differs from the scheme default, so
/// `https://example.com:443/` and `https://example.com/` share an origin.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_mirror::url::origin;
///
/// let url = Url::parse("http://127.0.0.1:8080/a/b").unwrap();
/// assert_eq!(origin(&url), Some("http://127.0.0.1:8080".to_string()));
/// ```
pub fn origin(url: &Url) -> Option<String> {
    let host = extract_host(url)?;
    Some(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}
