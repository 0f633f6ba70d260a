//! Sumi-Harvest main entry point
//!
//! This is the command-line interface for the Sumi-Harvest page harvester.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use sumi_harvest::config::{load_config_with_hash, validate, Config};
use sumi_harvest::crawler::Coordinator;
use sumi_harvest::output::{format_output_stats, load_output_stats, print_report};
use sumi_harvest::storage::Schema;
use sumi_harvest::url::expand_template;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Sumi-Harvest: a resumable fetch-and-collect crawler
///
/// Sumi-Harvest fetches a numbered range of pages through rotating proxies,
/// extracts records with CSS selectors, and appends every record it has not
/// seen before to a CSV file. Rerunning with the same output file resumes.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable fetch-and-collect crawler", long_about = None)]
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

    /// Also write logs to this file, rotated daily
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Override the first page index
    #[arg(long, value_name = "N")]
    start: Option<u64>,

    /// Override the last page index (inclusive)
    #[arg(long, value_name = "N")]
    end: Option<u64>,

    /// Override the number of parallel workers
    #[arg(long, value_name = "N")]
    workers: Option<u32>,

    /// Override the CSV output path
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Validate config and show what would be crawled without fetching anything
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics for the existing output file and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(start) = self.start {
            config.crawler.start_index = start;
        }
        if let Some(end) = self.end {
            config.crawler.end_index = end;
        }
        if let Some(workers) = self.workers {
            config.crawler.workers = workers;
        }
        if let Some(output) = &self.output {
            config.output.csv_path = output.to_string_lossy().into_owned();
        }
    }

    fn has_overrides(&self) -> bool {
        self.start.is_some() || self.end.is_some() || self.workers.is_some() || self.output.is_some()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity; the guard flushes the log file on exit
    let _log_guard = setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.has_overrides() {
        cli.apply_overrides(&mut config);
        validate(&config).context("Invalid command-line override")?;
    }

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Console output always goes to stdout. With a log file, the same events
/// are also written there without ANSI colors.
fn setup_logging(
    verbose: u8,
    quiet: bool,
    log_file: Option<&Path>,
) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_harvest=info,warn"),
            1 => EnvFilter::new("sumi_harvest=debug,info"),
            2 => EnvFilter::new("sumi_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let (writer, guard) = log_file_writer(path)?;
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Opens a daily-rotated log file, creating its directory if needed
fn log_file_writer(path: &Path) -> anyhow::Result<(NonBlocking, WorkerGuard)> {
    let file_name = path
        .file_name()
        .with_context(|| format!("Log file path '{}' has no file name", path.display()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file_name.to_string_lossy())
        .build(dir)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    Ok(tracing_appender::non_blocking(appender))
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let crawler = &config.crawler;
    let pages = crawler.end_index - crawler.start_index + 1;

    println!("=== Sumi-Harvest Dry Run ===\n");

    println!("Crawl:");
    println!("  URL template: {}", crawler.url_template);
    println!(
        "  Indices: {}..={} ({} pages)",
        crawler.start_index, crawler.end_index, pages
    );
    println!(
        "  First page: {}",
        expand_template(&crawler.url_template, crawler.start_index)?
    );
    println!(
        "  Last page: {}",
        expand_template(&crawler.url_template, crawler.end_index)?
    );
    println!("  Workers: {}", crawler.workers);

    println!("\nFetch:");
    println!("  Max retries: {}", config.fetch.max_retries);
    println!("  Retry codes: {:?}", config.fetch.retry_codes);
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    if config.fetch.retry_delay_ms > 0 {
        println!("  Retry delay: {}ms", config.fetch.retry_delay_ms);
    }
    match &config.headers {
        Some(headers) => println!("  Headers: {} configured", headers.len()),
        None => println!("  Headers: built-in browser defaults"),
    }

    println!("\nProxies ({}):", config.proxies.len());
    for proxy in &config.proxies {
        let scheme = if proxy.https { "https" } else { "http" };
        println!("  - {}:{} ({})", proxy.host, proxy.port, scheme);
    }

    let schema = Schema::from_config(&config.output)?;
    println!("\nOutput:");
    println!("  CSV: {}", config.output.csv_path);
    println!("  Key field: {}", schema.key_field());
    println!("  Columns: {}", schema.display_names().join(", "));

    println!("\n✓ Configuration is valid");
    println!("✓ Would fetch {} pages with {} workers", pages, crawler.workers);

    Ok(())
}

/// Handles the --stats mode: shows statistics for the existing output file
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let stats = load_output_stats(&config.output)
        .with_context(|| format!("Failed to read {}", config.output.csv_path))?;
    print!("{}", format_output_stats(&stats));
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let coordinator = Coordinator::new(config).context("Failed to start crawl")?;

    let cancel = coordinator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight pages");
            cancel.cancel();
        }
    });

    match coordinator.run().await {
        Ok(report) => {
            if report.cancelled {
                tracing::warn!("Crawl cancelled; rerun to resume");
            } else {
                tracing::info!("Crawl completed successfully");
            }
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
