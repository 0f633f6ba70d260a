//! Crawler coordinator - main crawl orchestration logic
//!
//! This module runs the worker pool over the configured index range:
//! - Opening the output and seeding dedup state from it
//! - Handing out page indices to workers
//! - Fetching, extracting and collecting records
//! - Collecting run statistics and handling cancellation

use crate::config::{Config, CrawlerConfig};
use crate::crawler::collector::{Collector, OfferOutcome};
use crate::crawler::fetcher::{FailureReason, FetchResult, Fetcher};
use crate::extract::{Extractor, Page, SelectorExtractor};
use crate::output::CrawlReport;
use crate::storage::open_sink;
use crate::url::expand_template;
use crate::{ConfigError, HarvestError, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Per-run counters updated by every worker
#[derive(Debug, Default)]
struct RunStats {
    pages_attempted: AtomicU64,
    pages_fetched: AtomicU64,
    pages_exhausted: AtomicU64,
    pages_rejected: AtomicU64,
    records_written: AtomicU64,
    duplicates_skipped: AtomicU64,
    write_failures: AtomicU64,
}

impl RunStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// State shared by the workers of one run
struct WorkerContext {
    settings: CrawlerConfig,
    cursor: AtomicU64,
    fetcher: Arc<Fetcher>,
    extractor: Arc<dyn Extractor>,
    collector: Arc<Collector>,
    stats: RunStats,
    cancel: CancellationToken,
}

impl WorkerContext {
    /// Claims the next unprocessed index, or `None` when the range is done
    fn claim(&self) -> Option<u64> {
        let span = self.settings.end_index - self.settings.start_index;
        let offset = self.cursor.fetch_add(1, Ordering::Relaxed);
        if offset > span {
            None
        } else {
            Some(self.settings.start_index + offset)
        }
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    settings: CrawlerConfig,
    fetcher: Arc<Fetcher>,
    extractor: Arc<dyn Extractor>,
    collector: Arc<Collector>,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Creates a new coordinator from the configuration
    ///
    /// Opens (or creates) the output file and loads every key already in
    /// it, so the run skips records persisted by earlier runs.
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(HarvestError)` - Invalid rules or an unusable output file
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = Fetcher::from_config(&config)?;
        let extractor =
            SelectorExtractor::from_config(&config.extract, &config.output.key_field)?;
        let sink = open_sink(&config.output)?;
        let collector = Collector::open(Box::new(sink))?;

        tracing::info!(
            "Output: {} (key field '{}')",
            config.output.csv_path,
            config.output.key_field
        );
        if !fetcher.proxies().is_empty() {
            tracing::info!("Rotating across {} proxies", fetcher.proxies().len());
        }

        Ok(Self::with_parts(
            config.crawler,
            fetcher,
            Arc::new(extractor),
            collector,
        ))
    }

    /// Assembles a coordinator from already-built parts
    pub fn with_parts(
        settings: CrawlerConfig,
        fetcher: Fetcher,
        extractor: Arc<dyn Extractor>,
        collector: Collector,
    ) -> Self {
        Self {
            settings,
            fetcher: Arc::new(fetcher),
            extractor,
            collector: Arc::new(collector),
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops dispatch when cancelled
    ///
    /// Workers stop claiming new indices; fetches already in flight run to
    /// completion or time out.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    /// Runs the crawl over the whole index range
    ///
    /// Spawns `workers` tasks that each repeatedly claim the next index,
    /// fetch the page, extract records and offer them to the collector.
    /// Pages are processed in no particular order. Failed pages and failed
    /// writes are counted and logged but never stop the run; only a
    /// worker panic does.
    pub async fn run(&self) -> Result<CrawlReport> {
        let started_at = Utc::now();
        let timer = Instant::now();
        let previous_records = self.collector.count();

        let Some(span) = self
            .settings
            .end_index
            .checked_sub(self.settings.start_index)
        else {
            return Err(ConfigError::Validation(format!(
                "start-index ({}) must not exceed end-index ({})",
                self.settings.start_index, self.settings.end_index
            ))
            .into());
        };
        let pages = span.saturating_add(1);
        let workers = u64::from(self.settings.workers).clamp(1, pages);

        tracing::info!(
            "Crawling indices {}..={} ({} pages) with {} workers",
            self.settings.start_index,
            self.settings.end_index,
            pages,
            workers
        );

        let context = Arc::new(WorkerContext {
            settings: self.settings.clone(),
            cursor: AtomicU64::new(0),
            fetcher: Arc::clone(&self.fetcher),
            extractor: Arc::clone(&self.extractor),
            collector: Arc::clone(&self.collector),
            stats: RunStats::default(),
            cancel: self.cancel.clone(),
        });

        let mut pool = JoinSet::new();
        for id in 0..workers {
            pool.spawn(run_worker(id, Arc::clone(&context)));
        }

        let mut pool_failure = None;
        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task failed: {}", e);
                self.cancel.cancel();
                pool_failure.get_or_insert_with(|| e.to_string());
            }
        }

        if let Some(message) = pool_failure {
            return Err(HarvestError::WorkerPool(message));
        }

        let stats = &context.stats;
        let report = CrawlReport {
            started_at,
            finished_at: Utc::now(),
            elapsed: timer.elapsed(),
            pages_attempted: RunStats::get(&stats.pages_attempted),
            pages_fetched: RunStats::get(&stats.pages_fetched),
            pages_exhausted: RunStats::get(&stats.pages_exhausted),
            pages_rejected: RunStats::get(&stats.pages_rejected),
            records_written: RunStats::get(&stats.records_written),
            duplicates_skipped: RunStats::get(&stats.duplicates_skipped),
            write_failures: RunStats::get(&stats.write_failures),
            previous_records,
            total_records: self.collector.count(),
            cancelled: self.cancel.is_cancelled(),
        };

        tracing::info!(
            "Crawl finished: {} records written, {} total",
            report.records_written,
            report.total_records
        );

        Ok(report)
    }
}

async fn run_worker(id: u64, context: Arc<WorkerContext>) {
    tracing::debug!("Worker {} started", id);

    while !context.cancel.is_cancelled() {
        let Some(index) = context.claim() else {
            break;
        };
        process_index(&context, index).await;
    }

    tracing::debug!("Worker {} finished", id);
}

async fn process_index(context: &WorkerContext, index: u64) {
    let stats = &context.stats;
    RunStats::bump(&stats.pages_attempted);

    let url = match expand_template(&context.settings.url_template, index) {
        Ok(url) => url.to_string(),
        Err(e) => {
            tracing::error!("Cannot build URL for index {}: {}", index, e);
            RunStats::bump(&stats.pages_rejected);
            return;
        }
    };

    let (final_url, body) = match context.fetcher.fetch(&url).await {
        FetchResult::Success {
            final_url, body, ..
        } => (final_url, body),
        FetchResult::Failed { reason, attempts } => {
            match reason {
                FailureReason::RetriesExhausted { .. } => RunStats::bump(&stats.pages_exhausted),
                FailureReason::Rejected { .. } => RunStats::bump(&stats.pages_rejected),
            }
            tracing::debug!("No content for {} after {} attempts", url, attempts);
            return;
        }
    };
    RunStats::bump(&stats.pages_fetched);

    let page = Page {
        index,
        url,
        final_url,
        body,
    };

    let records = context.extractor.extract(&page);
    if records.is_empty() {
        tracing::warn!("No records found on {}", page.final_url);
    }

    for record in &records {
        match context.collector.offer(record) {
            Ok(OfferOutcome::Written { total }) => {
                RunStats::bump(&stats.records_written);
                tracing::info!("Records saved: {}", total);
            }
            Ok(OfferOutcome::Duplicate) => RunStats::bump(&stats.duplicates_skipped),
            Err(e) => {
                RunStats::bump(&stats.write_failures);
                tracing::error!("Failed to save record from {}: {}", page.final_url, e);
            }
        }
    }
}

/// Runs a complete crawl
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Statistics for the run
/// * `Err(HarvestError)` - Setup failed or a worker panicked
///
/// # Example
///
/// ```no_run
/// use sumi_harvest::config::load_config;
/// use sumi_harvest::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let report = run_crawl(config).await?;
/// println!("{} records written", report.records_written);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlReport> {
    Coordinator::new(config)?.run().await
}
