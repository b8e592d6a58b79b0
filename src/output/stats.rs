//! Statistics generation from crawl database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics and the broken-link report from the storage layer.

use crate::storage::{PageRecord, RunRecord, Storage};
use crate::SumiError;
use std::fmt::Write as _;

/// Crawl statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlStatistics {
    /// Total number of page records (fetch attempts)
    pub total_pages: u64,

    /// Pages written to the mirror
    pub saved_pages: u64,

    /// Pages whose fetch failed
    pub broken_pages: u64,

    /// Total number of link occurrences recorded
    pub total_links: u64,

    /// Pages with an accessibility report
    pub scanned_pages: u64,

    /// The most recent crawl run, if any
    pub latest_run: Option<RunRecord>,
}

impl CrawlStatistics {
    /// Loads statistics from storage
    pub fn from_storage(storage: &dyn Storage) -> Result<Self, SumiError> {
        Ok(Self {
            total_pages: storage.count_pages()?,
            saved_pages: storage.count_saved_pages()?,
            broken_pages: storage.broken_pages()?.len() as u64,
            total_links: storage.count_links()?,
            scanned_pages: storage.count_scanned_pages()?,
            latest_run: storage.get_latest_run()?,
        })
    }
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> Result<CrawlStatistics, SumiError> {
    CrawlStatistics::from_storage(storage)
}

/// Formats statistics for display
pub fn format_statistics(stats: &CrawlStatistics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Crawl Statistics ===\n");

    if let Some(run) = &stats.latest_run {
        let _ = writeln!(out, "Latest run: #{} ({})", run.id, run.status.to_db_string());
        let _ = writeln!(out, "  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            let _ = writeln!(out, "  Finished: {}", finished);
        }
        let _ = writeln!(out);
    }

    let percentage = |count: u64| {
        if stats.total_pages > 0 {
            (count as f64 / stats.total_pages as f64) * 100.0
        } else {
            0.0
        }
    };

    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Total pages fetched: {}", stats.total_pages);
    let _ = writeln!(
        out,
        "  Saved: {} ({:.1}%)",
        stats.saved_pages,
        percentage(stats.saved_pages)
    );
    let _ = writeln!(
        out,
        "  Broken: {} ({:.1}%)",
        stats.broken_pages,
        percentage(stats.broken_pages)
    );
    let _ = writeln!(out, "  Scanned: {}", stats.scanned_pages);
    let _ = writeln!(out, "  Total links found: {}", stats.total_links);
    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    print!("{}", format_statistics(stats));
}

/// Formats the broken-link report
pub fn format_broken_links(pages: &[PageRecord]) -> String {
    let mut out = String::new();
    if pages.is_empty() {
        let _ = writeln!(out, "No broken links found.");
        return out;
    }

    let _ = writeln!(out, "Broken links ({}):", pages.len());
    for page in pages {
        let status = page
            .status_code
            .map_or_else(|| "no response".to_string(), |code| code.to_string());
        let _ = writeln!(out, "  [{}] {}", status, page.url);
    }
    out
}

/// Prints the broken-link report to stdout
pub fn print_broken_links(pages: &[PageRecord]) {
    print!("{}", format_broken_links(pages));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::CrawlSummary;
    use crate::storage::{RunStatus, SqliteStorage};
    use chrono::Utc;

    fn page(url: &str, status_code: Option<u16>, local_path: Option<&str>) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            host: "h".to_string(),
            status_code,
            content_type: None,
            local_path: local_path.map(str::to_string),
            fetched_at: Utc::now(),
            scan_result: None,
        }
    }

    #[test]
    fn test_statistics_from_storage() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        let run_id = storage.create_run("hash").unwrap();
        storage.record_page(&page("http://h/", Some(200), Some("/o/h/index.html"))).unwrap();
        storage.record_page(&page("http://h/gone", Some(404), None)).unwrap();
        storage.record_link("http://h/", "http://h/gone").unwrap();
        storage.save_scan("/o/h/index.html", "[]").unwrap();
        storage
            .complete_run(run_id, RunStatus::Completed, &CrawlSummary::default())
            .unwrap();

        let stats = load_statistics(&storage).unwrap();
        assert_eq!(stats.total_pages, 2);
        assert_eq!(stats.saved_pages, 1);
        assert_eq!(stats.broken_pages, 1);
        assert_eq!(stats.total_links, 1);
        assert_eq!(stats.scanned_pages, 1);
        assert_eq!(stats.latest_run.as_ref().map(|r| r.status), Some(RunStatus::Completed));

        let text = format_statistics(&stats);
        assert!(text.contains("Latest run: #1 (completed)"));
        assert!(text.contains("Saved: 1 (50.0%)"));
    }

    #[test]
    fn test_statistics_empty_database() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let stats = CrawlStatistics::from_storage(&storage).unwrap();
        assert_eq!(stats.total_pages, 0);
        assert!(stats.latest_run.is_none());
        assert!(format_statistics(&stats).contains("Saved: 0 (0.0%)"));
    }

    #[test]
    fn test_format_broken_links() {
        let pages = vec![
            page("http://h/gone", Some(404), None),
            page("http://h/down", None, None),
        ];
        let text = format_broken_links(&pages);
        assert!(text.contains("Broken links (2):"));
        assert!(text.contains("[404] http://h/gone"));
        assert!(text.contains("[no response] http://h/down"));
        assert_eq!(format_broken_links(&[]), "No broken links found.\n");
    }
}
