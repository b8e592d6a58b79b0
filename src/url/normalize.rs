use crate::UrlError;
use url::Url;

/// Reference prefixes that never point at a fetchable document
const SKIPPED_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Normalizes a URL string into the canonical form used as a visited-set key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject schemes other than http and https
/// 3. Reject URLs without a host
/// 4. Remove fragment (everything after #)
/// 5. Remove empty query string (trailing ?)
///
/// Lowercasing of scheme and host, default-port removal and dot-segment
/// removal are performed by the parser itself. Trailing slashes are kept:
/// `/docs/` and `/docs` resolve relative links differently.
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::normalize_url;
///
/// let url = normalize_url("HTTP://Example.COM:80/a/../b/?#top").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/b/");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

/// Normalizes an already-parsed URL (see [`normalize_url`])
pub fn normalize_parsed(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}

/// Resolves a possibly-relative reference against the page it appeared on
///
/// Returns `None` for empty and fragment-only references, for
/// `javascript:`, `mailto:`, `tel:` and `data:` references, and for anything
/// that does not resolve to a well-formed http(s) URL.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_mirror::url::resolve;
///
/// let base = Url::parse("https://example.com/docs/intro.html").unwrap();
/// assert_eq!(
///     resolve(&base, "../img/logo.png#x").unwrap().as_str(),
///     "https://example.com/img/logo.png"
/// );
/// assert!(resolve(&base, "mailto:team@example.com").is_none());
/// ```
pub fn resolve(base: &Url, raw_href: &str) -> Option<Url> {
    let href = raw_href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if SKIPPED_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
    {
        return None;
    }

    let joined = base.join(href).ok()?;
    normalize_parsed(joined).ok()
}
