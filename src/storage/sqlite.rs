//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::output::CrawlSummary;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{LinkRecord, PageRecord, RunRecord, RunStatus};
use crate::url::ScopePolicy;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use url::Url;

const PAGE_COLUMNS: &str =
    "url, host, status_code, content_type, local_path, fetched_at, scan_result";

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, \
     pages_saved, pages_failed, pages_skipped, links_discovered";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage").finish_non_exhaustive()
    }
}

impl SqliteStorage {
    /// Opens (or creates) a database file
    ///
    /// Missing parent directories are created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn query_page_list(&self, sql: &str) -> StorageResult<Vec<PageRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let pages = stmt
            .query_map([], page_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pages)
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    let fetched_at: String = row.get(5)?;
    let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);

    Ok(PageRecord {
        url: row.get(0)?,
        host: row.get(1)?,
        status_code: row.get(2)?,
        content_type: row.get(3)?,
        local_path: row.get(4)?,
        fetched_at,
        scan_result: row.get(6)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    let status: String = row.get(4)?;
    let status = RunStatus::from_db_string(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Text,
            Box::new(StorageError::InvalidData(format!("run status {:?}", status))),
        )
    })?;

    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status,
        pages_saved: row.get::<_, i64>(5)? as u64,
        pages_failed: row.get::<_, i64>(6)? as u64,
        pages_skipped: row.get::<_, i64>(7)? as u64,
        links_discovered: row.get::<_, i64>(8)? as u64,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO crawl_runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn complete_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        summary: &CrawlSummary,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE crawl_runs SET status = ?1, finished_at = ?2, pages_saved = ?3,
             pages_failed = ?4, pages_skipped = ?5, links_discovered = ?6 WHERE id = ?7",
            params![
                status.to_db_string(),
                now,
                summary.pages_saved as i64,
                summary.pages_failed as i64,
                summary.pages_skipped as i64,
                summary.links_discovered as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::NotFound(format!("Run {}", run_id)));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM crawl_runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound(format!("Run {}", run_id)))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM crawl_runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    // ===== Page Management =====

    fn record_page(&mut self, page: &PageRecord) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO pages (url, host, status_code, content_type, local_path, fetched_at, scan_result)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(url) DO UPDATE SET
                host = excluded.host,
                status_code = excluded.status_code,
                content_type = excluded.content_type,
                local_path = excluded.local_path,
                fetched_at = excluded.fetched_at,
                scan_result = excluded.scan_result",
            params![
                page.url,
                page.host,
                page.status_code,
                page.content_type,
                page.local_path,
                page.fetched_at.to_rfc3339(),
                page.scan_result
            ],
        )?;
        Ok(())
    }

    fn get_page_by_url(&self, url: &str) -> StorageResult<Option<PageRecord>> {
        let page = self
            .conn
            .query_row(
                &format!("SELECT {} FROM pages WHERE url = ?1", PAGE_COLUMNS),
                params![url],
                page_from_row,
            )
            .optional()?;
        Ok(page)
    }

    fn query_pages(&self, host_filter: &[String]) -> StorageResult<Vec<PageRecord>> {
        let pages = self.query_page_list(&format!("SELECT {} FROM pages ORDER BY id", PAGE_COLUMNS))?;
        if host_filter.is_empty() {
            return Ok(pages);
        }

        let scope = ScopePolicy::new(host_filter);
        Ok(pages
            .into_iter()
            .filter(|page| {
                Url::parse(&page.url)
                    .map(|url| scope.in_scope(&url))
                    .unwrap_or(false)
            })
            .collect())
    }

    fn broken_pages(&self) -> StorageResult<Vec<PageRecord>> {
        self.query_page_list(&format!(
            "SELECT {} FROM pages WHERE status_code IS NULL OR status_code >= 400 ORDER BY url",
            PAGE_COLUMNS
        ))
    }

    fn save_scan(&mut self, local_path: &str, result: &str) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE pages SET scan_result = ?1 WHERE local_path = ?2",
            params![result, local_path],
        )?;

        if updated == 0 {
            return Err(StorageError::NotFound(format!("Page saved at {}", local_path)));
        }
        Ok(())
    }

    // ===== Link Management =====

    fn record_link(&mut self, from_url: &str, to_url: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO links (from_url, to_url, discovered_at) VALUES (?1, ?2, ?3)",
            params![from_url, to_url, now],
        )?;
        Ok(())
    }

    fn links_from(&self, from_url: &str) -> StorageResult<Vec<LinkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT from_url, to_url, discovered_at FROM links WHERE from_url = ?1 ORDER BY id",
        )?;

        let links = stmt
            .query_map(params![from_url], |row| {
                Ok(LinkRecord {
                    from_url: row.get(0)?,
                    to_url: row.get(1)?,
                    discovered_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(links)
    }

    // ===== Statistics =====

    fn count_pages(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM pages")
    }

    fn count_saved_pages(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM pages WHERE local_path IS NOT NULL")
    }

    fn count_scanned_pages(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM pages WHERE scan_result IS NOT NULL")
    }

    fn count_links(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM links")
    }
}
