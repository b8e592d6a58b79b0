/// Checks if a host matches a wildcard pattern
///
/// This function supports two types of patterns:
/// 1. Exact match: "example.com" matches only "example.com"
/// 2. Wildcard match: "*.example.com" matches:
///    - "example.com" (the bare domain)
///    - "blog.example.com" (single subdomain)
///    - "api.v2.example.com" (nested subdomains)
///
/// Both arguments are expected to be lowercase already.
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(!matches_wildcard("example.com", "other.com"));
///
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "example.org"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

/// Checks a host (and optional port) against an allow-list entry
///
/// Entries without a port match any port; `host:port` entries match only
/// that port. Host comparison is case-insensitive.
pub fn matches_host_entry(entry: &str, host: &str, port: Option<u16>) -> bool {
    let entry = entry.to_lowercase();
    let host = host.to_lowercase();

    match entry.rsplit_once(':') {
        Some((pattern, entry_port)) => {
            port.map(|p| p.to_string()).as_deref() == Some(entry_port)
                && matches_wildcard(pattern, &host)
        }
        None => matches_wildcard(&entry, &host),
    }
}
