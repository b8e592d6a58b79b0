//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with redirect following and content-type detection
//! - HTML parsing, link extraction and link rewriting
//! - The shared frontier with single-claim semantics
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod parser;

pub use coordinator::{run_crawl, CancelHandle, Coordinator};
pub use fetcher::{build_http_client, build_scoped_http_client, is_html, FetchError, FetchedPage, Fetcher};
pub use frontier::{ClaimedItem, Frontier, FrontierItem};
pub use parser::{extract_links, parse_html, rewrite_links, ParsedPage};
