//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching robots.txt files.
//! Each origin's file is fetched at most once per crawl (modulo a benign race) with the
//! same client and user agent as page fetches. Anything that prevents reading the file
//! (missing, server error, timeout, invalid UTF-8) results in an allow-all policy.

mod cache;
mod parser;

pub use cache::RobotsCache;
pub use parser::{product_token, ParsedRobots, MAX_CRAWL_DELAY};

use crate::crawler::Fetcher;
use crate::url::origin;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Answers allow/deny for candidate URLs, per origin
#[derive(Debug)]
pub struct RobotsGate {
    cache: RobotsCache,
    fetcher: Fetcher,
    user_agent: String,
}

impl RobotsGate {
    /// Creates a gate that fetches robots.txt through `fetcher`
    ///
    /// `user_agent` must be the agent the fetcher sends, so the policy applied is
    /// the policy for the requests actually made.
    pub fn new(fetcher: Fetcher, user_agent: impl Into<String>) -> Self {
        Self {
            cache: RobotsCache::new(),
            fetcher,
            user_agent: user_agent.into(),
        }
    }

    /// Returns true if robots.txt for the URL's origin allows fetching it
    pub async fn allowed(&self, url: &Url) -> bool {
        match self.policy_for(url).await {
            Some(robots) => robots.is_allowed(url.as_str(), &self.user_agent),
            None => true,
        }
    }

    /// Crawl-delay for the URL's origin, if its robots.txt is already cached
    pub fn crawl_delay(&self, url: &Url) -> Option<Duration> {
        let origin = origin(url)?;
        self.cache.get(&origin)?.crawl_delay(&self.user_agent)
    }

    /// The per-origin cache
    pub fn cache(&self) -> &RobotsCache {
        &self.cache
    }

    /// Returns the cached policy for the URL's origin, fetching it on first use
    ///
    /// Returns `None` only for URLs without an origin.
    pub async fn policy_for(&self, url: &Url) -> Option<Arc<ParsedRobots>> {
        let origin = origin(url)?;

        if let Some(robots) = self.cache.get(&origin) {
            return Some(robots);
        }

        let robots = self.fetch_robots(&origin).await;
        Some(self.cache.insert(&origin, robots))
    }

    async fn fetch_robots(&self, origin: &str) -> ParsedRobots {
        let robots_url = match Url::parse(&format!("{}/robots.txt", origin)) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Cannot build robots.txt URL for {}: {}", origin, e);
                return ParsedRobots::allow_all();
            }
        };

        match self.fetcher.fetch(&robots_url).await {
            Ok(page) => match String::from_utf8(page.body) {
                Ok(content) => {
                    tracing::debug!("Fetched {}", robots_url);
                    ParsedRobots::from_content(&content)
                }
                Err(_) => {
                    tracing::warn!("{} is not valid UTF-8, allowing all", robots_url);
                    ParsedRobots::allow_all()
                }
            },
            Err(e) if e.status_code().map_or(false, |s| (400..500).contains(&s)) => {
                tracing::debug!("No robots.txt for {} ({})", origin, e);
                ParsedRobots::allow_all()
            }
            Err(e) => {
                tracing::warn!("Failed to fetch robots.txt for {}, allowing all: {}", origin, e);
                ParsedRobots::allow_all()
            }
        }
    }
}
