//! URL handling module for Sumi-Mirror
//!
//! This module provides link resolution, URL normalization, origin extraction,
//! host pattern matching, and the scope policy that decides which discovered
//! URLs are eligible for fetching.

mod domain;
mod matcher;
mod normalize;

use crate::config::CrawlerConfig;
use url::Url;

// Re-export main functions
pub use domain::{extract_host, origin};
pub use matcher::{matches_host_entry, matches_wildcard};
pub use normalize::{normalize_parsed, normalize_url, resolve};

/// Decides whether a URL may be fetched
///
/// A URL is in scope iff its scheme is `http` or `https` and either the
/// allow-list is empty or the URL's host matches one of its entries
/// (case-insensitively; see [`matches_host_entry`] for the entry syntax).
/// Port entries compare against the effective port, so `example.com:443`
/// matches `https://example.com/`.
///
/// Scope is checked on resolved URLs, before any robots.txt lookup.
#[derive(Debug, Clone, Default)]
pub struct ScopePolicy {
    allowed_hosts: Vec<String>,
}

impl ScopePolicy {
    /// Creates a policy from an allow-list (empty = any http/https host)
    pub fn new<I, S>(allowed_hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_hosts: allowed_hosts
                .into_iter()
                .map(|h| h.as_ref().trim().to_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    /// Creates a policy from the crawler configuration
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(&config.allowed_hosts)
    }

    /// Returns the normalized allow-list
    pub fn allowed_hosts(&self) -> &[String] {
        &self.allowed_hosts
    }

    /// Returns true if the URL is eligible for fetching
    ///
    /// # Examples
    ///
    /// ```
    /// use url::Url;
    /// use sumi_mirror::url::ScopePolicy;
    ///
    /// let scope = ScopePolicy::new(["example.com"]);
    /// assert!(scope.in_scope(&Url::parse("https://EXAMPLE.com/a").unwrap()));
    /// assert!(!scope.in_scope(&Url::parse("https://other.org/").unwrap()));
    /// assert!(!scope.in_scope(&Url::parse("ftp://example.com/").unwrap()));
    /// ```
    pub fn in_scope(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }

        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host,
            _ => return false,
        };

        if self.allowed_hosts.is_empty() {
            return true;
        }

        self.allowed_hosts
            .iter()
            .any(|entry| matches_host_entry(entry, host, url.port_or_known_default()))
    }
}
