//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::output::CrawlSummary;
use crate::storage::{LinkRecord, PageRecord, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed by the crawler, the
/// reports and the scan step. Crawl workers share one backend behind a mutex
/// (see [`SharedStorage`](crate::storage::SharedStorage)).
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run in the `running` state
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Finishes a run with its final status and counters
    fn complete_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        summary: &CrawlSummary,
    ) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    // ===== Page Management =====

    /// Inserts a page record, replacing any previous record for the same URL
    fn record_page(&mut self, page: &PageRecord) -> StorageResult<()>;

    /// Gets a page by URL
    fn get_page_by_url(&self, url: &str) -> StorageResult<Option<PageRecord>>;

    /// Gets pages whose URL matches any host filter entry (empty filter = all pages)
    ///
    /// Entries use the allow-list syntax: `example.com`, `*.example.com`, `host:port`.
    fn query_pages(&self, host_filter: &[String]) -> StorageResult<Vec<PageRecord>>;

    /// Gets pages whose fetch failed (status >= 400 or no response)
    fn broken_pages(&self) -> StorageResult<Vec<PageRecord>>;

    /// Attaches a scan report to the page saved at `local_path`
    fn save_scan(&mut self, local_path: &str, result: &str) -> StorageResult<()>;

    // ===== Link Management =====

    /// Records one link occurrence
    fn record_link(&mut self, from_url: &str, to_url: &str) -> StorageResult<()>;

    /// Gets all outgoing links from a page, in discovery order
    fn links_from(&self, from_url: &str) -> StorageResult<Vec<LinkRecord>>;

    // ===== Statistics =====

    /// Gets total page count
    fn count_pages(&self) -> StorageResult<u64>;

    /// Counts pages written to the mirror
    fn count_saved_pages(&self) -> StorageResult<u64>;

    /// Counts pages with a scan report
    fn count_scanned_pages(&self) -> StorageResult<u64>;

    /// Counts the total number of links
    fn count_links(&self) -> StorageResult<u64>;
}
