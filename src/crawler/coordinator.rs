//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the worker pool that drives a crawl session:
//! - Seeding the frontier with the start URL
//! - Running a fixed number of workers over the shared frontier
//! - Per item: scope and robots gates, fetch, link extraction, rewriting, saving
//! - Recording page and link records, counting outcomes
//! - Cooperative cancellation (external handle or deadline)
//!
//! Rate limiting is per worker: after each request a worker sleeps for the
//! configured delay (or the origin's robots.txt Crawl-delay, if longer), so N
//! workers issue up to N requests per delay interval. Cancellation cuts the
//! sleep short.

use crate::config::{self, hash_content, Config};
use crate::crawler::fetcher::{FetchedPage, Fetcher};
use crate::crawler::frontier::{ClaimedItem, Frontier, FrontierItem};
use crate::crawler::parser::{parse_html, rewrite_links};
use crate::mirror::{map_url, relative_href, MappedPath};
use crate::output::CrawlSummary;
use crate::robots::RobotsGate;
use crate::state::{CrawlPhase, PageOutcome};
use crate::storage::{lock_storage, PageRecord, RunStatus, SharedStorage, Storage};
use crate::url::{extract_host, normalize_parsed, ScopePolicy};
use crate::{ConfigError, SumiError};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use url::Url;

/// Log a progress line every this many processed items
const PROGRESS_INTERVAL: usize = 25;

/// Stops a running crawl
///
/// Cancellation is cooperative: workers stop claiming new items, in-flight
/// fetches finish (or hit their timeout), and `run` returns a summary with
/// `cancelled` set.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    frontier: Arc<Frontier>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        if !self.frontier.is_cancelled() {
            tracing::info!("Cancelling crawl");
        }
        self.frontier.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.frontier.is_cancelled()
    }
}

#[derive(Debug, Default)]
struct Counters {
    saved: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
    links: AtomicUsize,
}

impl Counters {
    /// Counts an outcome, returning the number of items processed so far
    fn record(&self, outcome: PageOutcome) -> usize {
        let counter = match outcome {
            PageOutcome::Saved => &self.saved,
            PageOutcome::Failed => &self.failed,
            PageOutcome::Skipped => &self.skipped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.saved.load(Ordering::Relaxed)
            + self.failed.load(Ordering::Relaxed)
            + self.skipped.load(Ordering::Relaxed)
    }
}

/// State shared by all workers of one session
struct CrawlContext {
    output_root: PathBuf,
    max_depth: u32,
    request_delay: Duration,
    scope: ScopePolicy,
    fetcher: Fetcher,
    robots: Option<RobotsGate>,
    frontier: Arc<Frontier>,
    storage: SharedStorage,
    counters: Counters,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    ctx: Arc<CrawlContext>,
    seed: Url,
    concurrency: usize,
    max_duration: Option<Duration>,
    config_hash: String,
    phase: Mutex<CrawlPhase>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `storage` - Where page and link records go
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(SumiError::Config)` - Invalid configuration (including the seed URL)
    pub fn new(config: Config, storage: SharedStorage) -> Result<Self, SumiError> {
        config::validate(&config)?;
        let crawler = &config.crawler;

        let seed = config::validate_start_url(&crawler.start_url)?;
        let seed = normalize_parsed(seed).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid start URL '{}': {}", crawler.start_url, e))
        })?;

        let scope = ScopePolicy::from_config(crawler);
        let fetcher = Fetcher::scoped(&crawler.user_agent, crawler.timeout(), scope.clone())?;
        // robots.txt redirects may leave the allow-list
        let robots = if crawler.respect_robots {
            let robots_fetcher = Fetcher::new(&crawler.user_agent, crawler.timeout())?;
            Some(RobotsGate::new(robots_fetcher, crawler.user_agent.clone()))
        } else {
            None
        };

        let frontier = Arc::new(Frontier::new(crawler.max_depth));
        let ctx = CrawlContext {
            output_root: PathBuf::from(&config.output.output_dir),
            max_depth: crawler.max_depth,
            request_delay: crawler.request_delay(),
            scope,
            fetcher,
            robots,
            frontier,
            storage,
            counters: Counters::default(),
        };

        Ok(Self {
            ctx: Arc::new(ctx),
            seed,
            concurrency: crawler.concurrency.max(1),
            max_duration: crawler.max_duration(),
            config_hash: hash_content(&format!("{:?}", config)),
            phase: Mutex::new(CrawlPhase::Idle),
        })
    }

    /// Overrides the configuration hash stored with the run record
    pub fn with_config_hash(mut self, config_hash: impl Into<String>) -> Self {
        self.config_hash = config_hash.into();
        self
    }

    /// Returns a handle that cancels this crawl
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            frontier: Arc::clone(&self.ctx.frontier),
        }
    }

    /// The normalized seed URL
    pub fn seed(&self) -> &Url {
        &self.seed
    }

    /// Current phase of the session
    pub fn phase(&self) -> CrawlPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, next: CrawlPhase) -> Result<(), SumiError> {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if !phase.can_transition_to(next) {
            return Err(SumiError::InvalidTransition {
                from: *phase,
                to: next,
            });
        }
        tracing::debug!("Crawl phase {} -> {}", *phase, next);
        *phase = next;
        Ok(())
    }

    /// Runs the crawl to completion
    ///
    /// Always terminates: when the frontier is empty and no worker is busy,
    /// or after cancellation. Per-page failures are counted, never returned.
    /// A coordinator runs once; a second call fails with `InvalidTransition`.
    pub async fn run(&self) -> Result<CrawlSummary, SumiError> {
        let started = Instant::now();
        self.transition(CrawlPhase::Seeding)?;

        let run_id = {
            let result = lock_storage(&self.ctx.storage).create_run(&self.config_hash);
            match result {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!("Failed to create run record: {}", e);
                    None
                }
            }
        };

        tracing::info!(
            "Starting crawl of {} with {} workers",
            self.seed,
            self.concurrency
        );
        self.ctx
            .frontier
            .push(FrontierItem::new(self.seed.clone(), 0));

        self.transition(CrawlPhase::Running)?;

        let deadline = self.max_duration.map(|limit| {
            let handle = self.cancel_handle();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                tracing::warn!("Crawl deadline of {:?} reached", limit);
                handle.cancel();
            })
        });

        let mut workers = JoinSet::new();
        for worker_id in 0..self.concurrency {
            workers.spawn(worker_loop(worker_id, Arc::clone(&self.ctx)));
        }

        let mut draining = false;
        while let Some(result) = workers.join_next().await {
            if !draining {
                self.transition(CrawlPhase::Draining)?;
                draining = true;
            }
            if let Err(e) = result {
                tracing::error!("Crawl worker failed: {}", e);
            }
        }

        if let Some(deadline) = deadline {
            deadline.abort();
        }

        let counters = &self.ctx.counters;
        let summary = CrawlSummary {
            pages_saved: counters.saved.load(Ordering::Relaxed),
            pages_failed: counters.failed.load(Ordering::Relaxed),
            pages_skipped: counters.skipped.load(Ordering::Relaxed),
            links_discovered: counters.links.load(Ordering::Relaxed),
            cancelled: self.ctx.frontier.is_cancelled(),
            elapsed: started.elapsed(),
        };

        self.transition(CrawlPhase::Done)?;

        if let Some(run_id) = run_id {
            let status = if summary.cancelled {
                RunStatus::Cancelled
            } else {
                RunStatus::Completed
            };
            let result = lock_storage(&self.ctx.storage).complete_run(run_id, status, &summary);
            if let Err(e) = result {
                tracing::warn!("Failed to complete run record {}: {}", run_id, e);
            }
        }

        tracing::info!(
            "Crawl {}: {} saved, {} failed, {} skipped, {} links in {:.1}s",
            if summary.cancelled { "cancelled" } else { "complete" },
            summary.pages_saved,
            summary.pages_failed,
            summary.pages_skipped,
            summary.links_discovered,
            summary.elapsed.as_secs_f64()
        );

        Ok(summary)
    }
}

/// Runs a complete crawl
///
/// This is the main entry point for starting a crawl. Only configuration
/// errors (an invalid seed URL above all) are returned as errors.
pub async fn run_crawl(config: Config, storage: SharedStorage) -> Result<CrawlSummary, SumiError> {
    Coordinator::new(config, storage)?.run().await
}

async fn worker_loop(worker_id: usize, ctx: Arc<CrawlContext>) {
    tracing::trace!("Worker {} started", worker_id);

    while let Some(claimed) = ctx.frontier.pop().await {
        let outcome = process_item(&ctx, &claimed).await;
        let delay = request_delay(&ctx, &claimed.url);
        drop(claimed);

        let processed = ctx.counters.record(outcome);
        if processed % PROGRESS_INTERVAL == 0 {
            tracing::info!(
                "Progress: {} pages processed, {} queued, {} in flight",
                processed,
                ctx.frontier.len(),
                ctx.frontier.in_flight()
            );
        }

        // skipped items made no request to the site
        if outcome != PageOutcome::Skipped && !delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = ctx.frontier.cancelled() => {}
            }
        }
    }

    tracing::trace!("Worker {} finished", worker_id);
}

fn request_delay(ctx: &CrawlContext, url: &Url) -> Duration {
    let crawl_delay = ctx
        .robots
        .as_ref()
        .and_then(|robots| robots.crawl_delay(url))
        .unwrap_or_default();
    ctx.request_delay.max(crawl_delay)
}

async fn process_item(ctx: &CrawlContext, item: &ClaimedItem) -> PageOutcome {
    let url = &item.url;

    if !ctx.scope.in_scope(url) {
        tracing::debug!("Out of scope: {}", url);
        return PageOutcome::Skipped;
    }

    if let Some(robots) = &ctx.robots {
        if !robots.allowed(url).await {
            tracing::debug!("Disallowed by robots.txt: {}", url);
            return PageOutcome::Skipped;
        }
    }

    tracing::debug!("Fetching {} (depth {})", url, item.depth);
    let page = match ctx.fetcher.fetch(url).await {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!("{}", e);
            record_page(ctx, url, e.status_code(), None, None);
            return PageOutcome::Failed;
        }
    };

    if !ctx.scope.in_scope(&page.final_url) {
        tracing::warn!("{} ended out of scope at {}", url, page.final_url);
        record_page(ctx, url, Some(page.status_code), page.content_type.clone(), None);
        return PageOutcome::Failed;
    }

    let mapped = map_url(&ctx.output_root, url);
    let body = if page.is_html() {
        process_html(ctx, item, &page, mapped.as_ref().ok())
    } else {
        page.body.clone()
    };

    let local_path = match mapped {
        Ok(mapped) => match save_file(&mapped.file_path, &body).await {
            Ok(()) => Some(mapped.file_path.to_string_lossy().into_owned()),
            Err(e) => {
                tracing::warn!("Failed to save {} to {}: {}", url, mapped.file_path.display(), e);
                None
            }
        },
        Err(e) => {
            tracing::warn!("{}", e);
            None
        }
    };

    let saved = local_path.is_some();
    record_page(
        ctx,
        url,
        Some(page.status_code),
        page.content_type.clone(),
        local_path,
    );

    if saved {
        PageOutcome::Saved
    } else {
        PageOutcome::Failed
    }
}

/// Extracts, records and enqueues links, then returns the body to save
fn process_html(
    ctx: &CrawlContext,
    item: &ClaimedItem,
    page: &FetchedPage,
    mapped: Option<&MappedPath>,
) -> Vec<u8> {
    let base = &page.final_url;
    let html = String::from_utf8_lossy(&page.body);
    let parsed = parse_html(&html, base);

    match &parsed.title {
        Some(title) => tracing::info!("Fetched {} ({}): {} links", item.url, title, parsed.links.len()),
        None => tracing::info!("Fetched {}: {} links", item.url, parsed.links.len()),
    }

    record_links(ctx, &item.url, &parsed.links);

    let next_depth = item.depth + 1;
    for link in &parsed.links {
        if ctx.scope.in_scope(link) {
            ctx.frontier.push(FrontierItem::new(link.clone(), next_depth));
        }
    }

    // without a local path there is nothing to rewrite relative to; bytes that
    // are not UTF-8 are saved verbatim rather than re-encoded
    let Some(mapped) = mapped else {
        return page.body.clone();
    };
    if std::str::from_utf8(&page.body).is_err() {
        return page.body.clone();
    }

    let rewritten = rewrite_links(&html, base, |target, raw| {
        let fragment = raw.find('#').map_or("", |i| &raw[i..]);
        let local = (next_depth <= ctx.max_depth && ctx.scope.in_scope(target))
            .then(|| map_url(&ctx.output_root, target).ok())
            .flatten();

        Some(match local {
            Some(target_path) => format!(
                "{}{}",
                relative_href(&mapped.site_path, &target_path.site_path),
                fragment
            ),
            None => format!("{}{}", target, fragment),
        })
    });

    match rewritten {
        Ok(rewritten) => rewritten.into_bytes(),
        Err(e) => {
            tracing::warn!("Saving {} without rewriting: {}", item.url, e);
            page.body.clone()
        }
    }
}

fn record_links(ctx: &CrawlContext, from: &Url, links: &[Url]) {
    if links.is_empty() {
        return;
    }
    ctx.counters.links.fetch_add(links.len(), Ordering::Relaxed);

    let mut storage = lock_storage(&ctx.storage);
    for link in links {
        if let Err(e) = storage.record_link(from.as_str(), link.as_str()) {
            tracing::warn!("Failed to record link {} -> {}: {}", from, link, e);
        }
    }
}

fn record_page(
    ctx: &CrawlContext,
    url: &Url,
    status_code: Option<u16>,
    content_type: Option<String>,
    local_path: Option<String>,
) {
    let record = PageRecord {
        url: url.to_string(),
        host: extract_host(url).unwrap_or_default(),
        status_code,
        content_type,
        local_path,
        fetched_at: Utc::now(),
        scan_result: None,
    };

    let result = lock_storage(&ctx.storage).record_page(&record);
    if let Err(e) = result {
        tracing::warn!("Failed to record page {}: {}", url, e);
    }
}

async fn save_file(path: &Path, body: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, body).await
}
