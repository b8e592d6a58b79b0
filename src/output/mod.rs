//! Output module for crawl summaries and reports
//!
//! This module handles:
//! - The end-of-crawl summary returned by the coordinator
//! - Statistics over the crawl database
//! - The broken-link report

pub mod stats;
mod summary;

pub use stats::{
    format_broken_links, format_statistics, load_statistics, print_broken_links,
    print_statistics, CrawlStatistics,
};
pub use summary::{format_summary, print_summary, CrawlSummary};
