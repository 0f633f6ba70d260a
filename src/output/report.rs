//! End-of-run report
//!
//! Summarizes what a crawl did: how many pages were fetched or given up
//! on, how many records were written or skipped, and how the output file
//! grew.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Statistics for one crawl run
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlReport {
    /// When dispatch started
    pub started_at: DateTime<Utc>,

    /// When the last worker finished
    pub finished_at: DateTime<Utc>,

    /// Wall-clock time spent crawling
    pub elapsed: Duration,

    /// Indices claimed by workers
    pub pages_attempted: u64,

    /// Pages fetched and handed to the extractor
    pub pages_fetched: u64,

    /// Pages given up on after every retry failed
    pub pages_exhausted: u64,

    /// Pages rejected with a non-retryable status
    pub pages_rejected: u64,

    /// Records written during this run
    pub records_written: u64,

    /// Records skipped because their key was already written
    pub duplicates_skipped: u64,

    /// Records the sink failed to write
    pub write_failures: u64,

    /// Rows already in the output when the run started
    pub previous_records: u64,

    /// Rows in the output when the run ended
    pub total_records: u64,

    /// Whether the run was cut short
    pub cancelled: bool,
}

impl CrawlReport {
    /// Pages that produced no content
    pub fn pages_failed(&self) -> u64 {
        self.pages_exhausted + self.pages_rejected
    }

    /// Pages fetched per second of wall-clock time
    pub fn pages_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.pages_fetched as f64 / secs
        } else {
            0.0
        }
    }
}

/// Formats a crawl report for the terminal
pub fn format_report(report: &CrawlReport) -> String {
    let mut out = String::new();

    out.push_str("=== Harvest Report ===\n\n");

    out.push_str("Run:\n");
    out.push_str(&format!(
        "  Started: {}\n",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!(
        "  Finished: {}\n",
        report.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!(
        "  Duration: {:.2}s ({:.2} pages/sec)\n",
        report.elapsed.as_secs_f64(),
        report.pages_per_second()
    ));
    if report.cancelled {
        out.push_str("  Status: cancelled\n");
    } else {
        out.push_str("  Status: completed\n");
    }
    out.push('\n');

    out.push_str("Pages:\n");
    out.push_str(&format!("  Attempted: {}\n", report.pages_attempted));
    out.push_str(&format!("  Fetched: {}\n", report.pages_fetched));
    out.push_str(&format!(
        "  Failed: {} ({} retries exhausted, {} rejected)\n",
        report.pages_failed(),
        report.pages_exhausted,
        report.pages_rejected
    ));
    out.push('\n');

    out.push_str("Records:\n");
    out.push_str(&format!("  Written: {}\n", report.records_written));
    out.push_str(&format!("  Duplicates skipped: {}\n", report.duplicates_skipped));
    if report.write_failures > 0 {
        out.push_str(&format!("  Write failures: {}\n", report.write_failures));
    }
    out.push_str(&format!(
        "  Total in output: {} ({} before this run)\n",
        report.total_records, report.previous_records
    ));

    out
}

/// Prints a crawl report to stdout
pub fn print_report(report: &CrawlReport) {
    print!("{}", format_report(report));
}

/// Summary of an existing output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputStats {
    pub path: String,
    pub rows: u64,
    pub distinct_keys: usize,
}

/// Formats output file statistics for the terminal
pub fn format_output_stats(stats: &OutputStats) -> String {
    let mut out = String::new();
    out.push_str("=== Output Statistics ===\n\n");
    out.push_str(&format!("  File: {}\n", stats.path));
    out.push_str(&format!("  Records: {}\n", stats.rows));
    out.push_str(&format!("  Distinct keys: {}\n", stats.distinct_keys));

    let duplicates = stats.rows.saturating_sub(stats.distinct_keys as u64);
    if duplicates > 0 {
        out.push_str(&format!("  Rows sharing a key: {}\n", duplicates));
    }
    out
}
