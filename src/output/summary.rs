//! End-of-crawl summary

use std::fmt::Write as _;
use std::time::Duration;

/// Summary statistics for a crawl session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Pages fetched and written to the mirror
    pub pages_saved: usize,

    /// Pages whose fetch, path mapping or write failed
    pub pages_failed: usize,

    /// Claimed pages never fetched (out of scope or disallowed by robots.txt)
    pub pages_skipped: usize,

    /// Link occurrences found on fetched HTML pages, out-of-scope links included
    pub links_discovered: usize,

    /// True if the session was stopped by cancellation or its deadline
    pub cancelled: bool,

    /// Wall-clock duration of the session
    pub elapsed: Duration,
}

impl CrawlSummary {
    /// Number of claimed items that were processed in any way
    pub fn total_processed(&self) -> usize {
        self.pages_saved + self.pages_failed + self.pages_skipped
    }

    /// Saved pages as a percentage of fetch attempts
    pub fn success_rate(&self) -> f64 {
        let attempted = self.pages_saved + self.pages_failed;
        if attempted == 0 {
            return 0.0;
        }
        (self.pages_saved as f64 / attempted as f64) * 100.0
    }
}

/// Formats a summary for display
pub fn format_summary(summary: &CrawlSummary) -> String {
    let mut out = String::new();
    let status = if summary.cancelled {
        "cancelled"
    } else {
        "completed"
    };

    let _ = writeln!(out, "=== Crawl Summary ===\n");
    let _ = writeln!(out, "Status: {}", status);
    let _ = writeln!(out, "Duration: {:.1}s", summary.elapsed.as_secs_f64());
    let _ = writeln!(out, "  Pages saved: {}", summary.pages_saved);
    let _ = writeln!(out, "  Pages failed: {}", summary.pages_failed);
    let _ = writeln!(out, "  Pages skipped: {}", summary.pages_skipped);
    let _ = writeln!(out, "  Links discovered: {}", summary.links_discovered);
    let _ = writeln!(out, "Success Rate: {:.1}%", summary.success_rate());
    out
}

/// Prints a summary to stdout
pub fn print_summary(summary: &CrawlSummary) {
    print!("{}", format_summary(summary));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> CrawlSummary {
        CrawlSummary {
            pages_saved: 9,
            pages_failed: 1,
            pages_skipped: 2,
            links_discovered: 40,
            cancelled: false,
            elapsed: Duration::from_millis(2500),
        }
    }

    #[test]
    fn test_totals() {
        let summary = summary();
        assert_eq!(summary.total_processed(), 12);
        assert!((summary.success_rate() - 90.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_success_rate_empty() {
        assert_eq!(CrawlSummary::default().success_rate(), 0.0);
    }

    #[test]
    fn test_format_summary() {
        let text = format_summary(&summary());
        assert!(text.contains("Status: completed"));
        assert!(text.contains("Duration: 2.5s"));
        assert!(text.contains("Pages saved: 9"));
        assert!(text.contains("Links discovered: 40"));
        assert!(text.contains("Success Rate: 90.0%"));
    }

    #[test]
    fn test_format_cancelled() {
        let summary = CrawlSummary {
            cancelled: true,
            ..CrawlSummary::default()
        };
        assert!(format_summary(&summary).contains("Status: cancelled"));
    }
}
