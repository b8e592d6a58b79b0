//! Per-origin robots.txt cache
//!
//! Entries live for the duration of one crawl. The map lock is only held for
//! lookups and inserts, never across a fetch, so two workers may race to fetch
//! the same origin's robots.txt; the last insert wins and both results are
//! equivalent.

use crate::robots::ParsedRobots;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Thread-safe map from origin (`scheme://host[:port]`) to its robots policy
#[derive(Debug, Default)]
pub struct RobotsCache {
    entries: Mutex<HashMap<String, Arc<ParsedRobots>>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the policy for an origin
    pub fn get(&self, origin: &str) -> Option<Arc<ParsedRobots>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(origin).map(Arc::clone)
    }

    /// Stores the policy for an origin, replacing any previous entry
    pub fn insert(&self, origin: &str, robots: ParsedRobots) -> Arc<ParsedRobots> {
        let robots = Arc::new(robots);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(origin.to_string(), Arc::clone(&robots));
        robots
    }

    /// Number of cached origins
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_origin() {
        let cache = RobotsCache::new();
        assert!(cache.get("https://example.com").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_then_get() {
        let cache = RobotsCache::new();
        cache.insert(
            "https://example.com",
            ParsedRobots::from_content("User-agent: *\nDisallow: /private/"),
        );

        let robots = cache.get("https://example.com").unwrap();
        assert!(!robots.is_allowed("https://example.com/private/x", "TestBot"));
        assert!(cache.get("https://example.com:8443").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_last_insert_wins() {
        let cache = RobotsCache::new();
        cache.insert("http://h", ParsedRobots::from_content("User-agent: *\nDisallow: /"));
        cache.insert("http://h", ParsedRobots::allow_all());

        assert!(cache.get("http://h").unwrap().is_allow_all());
        assert_eq!(cache.len(), 1);
    }
}
