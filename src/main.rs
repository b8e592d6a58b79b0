//! Sumi-Mirror main entry point
//!
//! This is the command-line interface for the Sumi-Mirror site mirroring tool.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use sumi_mirror::config::{load_config_with_hash, Config};
use sumi_mirror::crawler::Coordinator;
use sumi_mirror::output::{load_statistics, print_broken_links, print_statistics, print_summary};
use sumi_mirror::scan::{scan_site, Scanner};
use sumi_mirror::storage::{lock_storage, open_storage, shared, SharedStorage};
use tracing_subscriber::EnvFilter;

/// Sumi-Mirror: a polite concurrent site mirror
///
/// Sumi-Mirror crawls a site from a seed URL, respecting robots.txt and
/// rate limits, saves every in-scope page under a host-named directory with
/// links rewritten to the local copies, and records what it saw in SQLite.
#[derive(Parser, Debug)]
#[command(name = "sumi-mirror")]
#[command(version)]
#[command(about = "A polite concurrent site mirror", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "scan", "scan_file", "broken_links"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "scan", "scan_file", "broken_links"])]
    stats: bool,

    /// Run the accessibility scan over every saved page and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "scan_file", "broken_links"])]
    scan: bool,

    /// Run the accessibility scan on a single saved file and print the report
    #[arg(long, value_name = "PATH", conflicts_with_all = ["dry_run", "stats", "scan", "broken_links"])]
    scan_file: Option<PathBuf>,

    /// List pages whose fetch failed and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "scan", "scan_file"])]
    broken_links: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.broken_links {
        handle_broken_links(&config)?;
    } else if let Some(path) = &cli.scan_file {
        handle_scan_file(&config, path).await?;
    } else if cli.scan {
        handle_scan(&config).await?;
    } else {
        handle_crawl(config, config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_mirror=info,warn"),
            1 => EnvFilter::new("sumi_mirror=debug,info"),
            2 => EnvFilter::new("sumi_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open_shared_storage(config: &Config) -> anyhow::Result<SharedStorage> {
    let path = Path::new(&config.output.database_path);
    let storage = open_storage(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    Ok(shared(storage))
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    let crawler = &config.crawler;
    println!("=== Sumi-Mirror Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Start URL: {}", crawler.start_url);
    println!("  Max depth: {}", crawler.max_depth);
    println!("  Concurrency: {}", crawler.concurrency);
    println!("  Request delay: {}ms", crawler.request_delay_ms);
    println!("  Timeout: {}s", crawler.timeout_secs);
    match crawler.max_duration_secs {
        Some(secs) => println!("  Max duration: {}s", secs),
        None => println!("  Max duration: unlimited"),
    }
    println!("  Respect robots.txt: {}", crawler.respect_robots);
    println!("  User agent: {}", crawler.user_agent);

    if crawler.allowed_hosts.is_empty() {
        println!("\nAllowed Hosts: any");
    } else {
        println!("\nAllowed Hosts ({}):", crawler.allowed_hosts.len());
        for host in &crawler.allowed_hosts {
            println!("  - {}", host);
        }
    }

    println!("\nOutput:");
    println!("  Mirror directory: {}", config.output.output_dir);
    println!("  Database: {}", config.output.database_path);

    println!("\nScan:");
    println!("  Command: {} {}", config.scan.command, config.scan.args.join(" "));

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_shared_storage(config)?;
    let stats = load_statistics(&*lock_storage(&storage))?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --broken-links mode
fn handle_broken_links(config: &Config) -> anyhow::Result<()> {
    let storage = open_shared_storage(config)?;
    let broken = lock_storage(&storage).broken_pages()?;
    print_broken_links(&broken);

    Ok(())
}

/// Handles the --scan-file mode: scans one file and prints the report
async fn handle_scan_file(config: &Config, path: &Path) -> anyhow::Result<()> {
    let scanner = Scanner::from_config(&config.scan);
    let report = scanner
        .scan_file(path)
        .await
        .with_context(|| format!("Scan of {} failed", path.display()))?;
    println!("{}", report);

    Ok(())
}

/// Handles the --scan mode: scans every saved page of the allowed hosts
async fn handle_scan(config: &Config) -> anyhow::Result<()> {
    let storage = open_shared_storage(config)?;
    let scanner = Scanner::from_config(&config.scan);

    let summary = scan_site(&scanner, &storage, &config.crawler.allowed_hosts).await?;
    println!(
        "Scanned {} pages ({} missing, {} failed)",
        summary.scanned, summary.missing, summary.failed
    );

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> anyhow::Result<()> {
    let storage = open_shared_storage(&config)?;
    let coordinator = Coordinator::new(config, storage)?.with_config_hash(config_hash);

    let cancel = coordinator.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight pages");
            cancel.cancel();
        }
    });

    let summary = coordinator.run().await.context("Crawl failed")?;
    print_summary(&summary);

    Ok(())
}
