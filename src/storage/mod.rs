//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Run tracking (one record per crawl session)
//! - Page records (one per fetched URL, including failed fetches)
//! - Link edges (one per link occurrence, out-of-scope targets included)
//! - Accessibility scan results attached to saved pages
//!
//! The crawl engine only needs `record_page` and `record_link`; the query
//! operations back the reports and the scan step.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Storage handle shared between workers
///
/// The lock is held for single synchronous calls only, never across an await.
pub type SharedStorage = Arc<Mutex<dyn Storage + Send>>;

/// Wraps a storage backend for sharing between workers
pub fn shared<S>(storage: S) -> SharedStorage
where
    S: Storage + Send + 'static,
{
    Arc::new(Mutex::new(storage))
}

/// Locks a shared storage handle, recovering from poisoning
pub fn lock_storage(storage: &SharedStorage) -> MutexGuard<'_, dyn Storage + Send + 'static> {
    storage.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Initializes or opens a storage database
///
/// Parent directories of `path` are created as needed.
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::open(path)
}

/// Represents a fetched page in the database
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    /// Normalized URL (unique)
    pub url: String,
    /// Lowercase host
    pub host: String,
    /// HTTP status; `None` for network failures and timeouts
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    /// Saved file; `None` if nothing was written
    pub local_path: Option<String>,
    pub fetched_at: DateTime<Utc>,
    /// Accessibility report, once scanned
    pub scan_result: Option<String>,
}

impl PageRecord {
    /// Returns true if the page was written to the mirror
    pub fn is_saved(&self) -> bool {
        self.local_path.is_some()
    }

    /// Returns true if the fetch failed (error status or no response)
    pub fn is_broken(&self) -> bool {
        self.status_code.map_or(true, |code| code >= 400)
    }
}

/// Represents one discovered link occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub from_url: String,
    pub to_url: String,
    pub discovered_at: String,
}

/// Represents a crawl run
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub pages_saved: u64,
    pub pages_failed: u64,
    pub pages_skipped: u64,
    pub links_discovered: u64,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Cancelled,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(status_code: Option<u16>, local_path: Option<&str>) -> PageRecord {
        PageRecord {
            url: "http://h/".to_string(),
            host: "h".to_string(),
            status_code,
            content_type: None,
            local_path: local_path.map(str::to_string),
            fetched_at: Utc::now(),
            scan_result: None,
        }
    }

    #[test]
    fn test_run_status_roundtrip() {
        for status in &[RunStatus::Running, RunStatus::Completed, RunStatus::Cancelled] {
            let db_str = status.to_db_string();
            let parsed = RunStatus::from_db_string(db_str);
            assert_eq!(Some(*status), parsed);
        }
    }

    #[test]
    fn test_run_status_invalid() {
        assert_eq!(RunStatus::from_db_string("invalid"), None);
    }

    #[test]
    fn test_page_record_broken() {
        assert!(page(None, None).is_broken());
        assert!(page(Some(404), None).is_broken());
        assert!(page(Some(503), None).is_broken());
        assert!(!page(Some(200), Some("/out/h/index.html")).is_broken());
    }

    #[test]
    fn test_page_record_saved() {
        assert!(page(Some(200), Some("/out/h/index.html")).is_saved());
        assert!(!page(Some(200), None).is_saved());
    }

    #[test]
    fn test_shared_storage_locks() {
        let storage = shared(SqliteStorage::open_in_memory().unwrap());
        lock_storage(&storage).record_link("http://h/", "http://h/a").unwrap();
        assert_eq!(lock_storage(&storage).count_links().unwrap(), 1);
    }
}
