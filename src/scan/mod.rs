//! Accessibility scan of the mirrored pages
//!
//! After a crawl, every saved page can be passed to an external checker
//! (pa11y by default). The command and its arguments come from the `[scan]`
//! config section; the `{path}` placeholder is replaced by the saved file.
//! Reports are stored next to the page record.

use crate::config::ScanConfig;
use crate::storage::{lock_storage, SharedStorage, Storage};
use crate::SumiError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Placeholder in scan arguments replaced by the file path
pub const PATH_PLACEHOLDER: &str = "{path}";

/// Errors from running the scan command
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to run scan command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Scan of {path} timed out after {seconds}s")]
    Timeout { path: PathBuf, seconds: u64 },

    #[error("Saved file not found: {0}")]
    MissingFile(PathBuf),
}

/// Runs the configured scan command on saved files
#[derive(Debug, Clone)]
pub struct Scanner {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Scanner {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(
            config.command.clone(),
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Arguments with the placeholder substituted
    fn args_for(&self, path: &Path) -> Vec<String> {
        let path = path.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace(PATH_PLACEHOLDER, &path))
            .collect()
    }

    /// Scans one file and returns the report
    ///
    /// The report is stdout, or stderr when stdout is empty. A non-zero exit
    /// status still yields the report (pa11y exits non-zero when it finds issues).
    pub async fn scan_file(&self, path: &Path) -> Result<String, ScanError> {
        if !path.is_file() {
            return Err(ScanError::MissingFile(path.to_path_buf()));
        }

        tracing::debug!("Scanning {}", path.display());

        let child = Command::new(&self.command)
            .args(self.args_for(path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ScanError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ScanError::Timeout {
                path: path.to_path_buf(),
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|source| ScanError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if !output.status.success() {
            tracing::info!("Scan of {} exited with {}", path.display(), output.status);
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !stdout.is_empty() {
            return Ok(stdout);
        }
        Ok(String::from_utf8_lossy(&output.stderr).trim().to_string())
    }
}

/// Outcome counts of a site scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Reports stored
    pub scanned: usize,
    /// Page records whose saved file is gone
    pub missing: usize,
    /// Scans that timed out or could not be stored
    pub failed: usize,
}

/// Scans every saved page of the given hosts and stores the reports
///
/// An empty `hosts` list scans every saved page. Failure to start the scan
/// command aborts the whole scan; any other per-page failure is logged and
/// counted.
pub async fn scan_site(
    scanner: &Scanner,
    storage: &SharedStorage,
    hosts: &[String],
) -> Result<ScanSummary, SumiError> {
    let pages = lock_storage(storage).query_pages(hosts)?;
    let mut summary = ScanSummary::default();

    for page in pages {
        let Some(local_path) = page.local_path else {
            continue;
        };

        let report = match scanner.scan_file(Path::new(&local_path)).await {
            Ok(report) => report,
            Err(ScanError::MissingFile(path)) => {
                tracing::warn!("Cannot find saved file {} for {}", path.display(), page.url);
                summary.missing += 1;
                continue;
            }
            Err(e @ ScanError::Spawn { .. }) => return Err(e.into()),
            Err(e) => {
                tracing::warn!("{}", e);
                summary.failed += 1;
                continue;
            }
        };

        match lock_storage(storage).save_scan(&local_path, &report) {
            Ok(()) => summary.scanned += 1,
            Err(e) => {
                tracing::warn!("Failed to store scan for {}: {}", page.url, e);
                summary.failed += 1;
            }
        }
    }

    tracing::info!(
        "Scan finished: {} scanned, {} missing, {} failed",
        summary.scanned,
        summary.missing,
        summary.failed
    );
    Ok(summary)
}
