use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Sumi-Mirror
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub scan: ScanConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Seed URL the crawl starts from (depth 0)
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Maximum link depth from the seed; pages at exactly this depth are fetched
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Number of concurrent fetch workers
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Hosts eligible for fetching (empty = any http/https host)
    #[serde(rename = "allowed-hosts", default)]
    pub allowed_hosts: Vec<String>,

    /// Whether robots.txt policies are enforced
    #[serde(rename = "respect-robots", default = "default_respect_robots")]
    pub respect_robots: bool,

    /// User-Agent header sent with every request, also used for robots matching
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Delay each worker sleeps after a request (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Optional wall-clock limit for the whole session (seconds)
    #[serde(rename = "max-duration-secs", default)]
    pub max_duration_secs: Option<u64>,
}

impl CrawlerConfig {
    /// Per-worker delay between requests
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// Per-request fetch timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Session deadline, if one is configured
    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_secs.map(Duration::from_secs)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory of the mirrored site
    #[serde(rename = "output-dir", default = "default_output_dir")]
    pub output_dir: String,

    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            database_path: default_database_path(),
        }
    }
}

/// Accessibility scan configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Program to run for each saved page
    #[serde(default = "default_scan_command")]
    pub command: String,

    /// Arguments; `{path}` is replaced by the saved file's path
    #[serde(default = "default_scan_args")]
    pub args: Vec<String>,

    /// Time limit for a single scan (seconds)
    #[serde(rename = "timeout-secs", default = "default_scan_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            command: default_scan_command(),
            args: default_scan_args(),
            timeout_secs: default_scan_timeout_secs(),
        }
    }
}

fn default_max_depth() -> u32 {
    3
}

fn default_concurrency() -> usize {
    5
}

fn default_respect_robots() -> bool {
    true
}

pub(crate) fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

fn default_request_delay_ms() -> u64 {
    200
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_output_dir() -> String {
    "./_output".to_string()
}

fn default_database_path() -> String {
    "./_db/mirror.db".to_string()
}

fn default_scan_command() -> String {
    "npx".to_string()
}

fn default_scan_args() -> Vec<String> {
    ["pa11y", "{path}", "--reporter", "json"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_scan_timeout_secs() -> u64 {
    120
}
