//! Output module for crawl reports
//!
//! This module handles:
//! - The end-of-run `CrawlReport`
//! - Statistics about an existing output file

mod report;

pub use report::{format_output_stats, format_report, print_report, CrawlReport, OutputStats};

use crate::config::OutputConfig;
use crate::storage::{CsvSink, Schema, SinkResult};
use std::path::Path;

/// Reads statistics from the configured output file without modifying it
///
/// # Arguments
///
/// * `config` - The output configuration
///
/// # Returns
///
/// * `Ok(OutputStats)` - Row and key counts (zero when the file is missing)
/// * `Err(SinkError)` - The file exists but does not match the schema
pub fn load_output_stats(config: &OutputConfig) -> SinkResult<OutputStats> {
    let path = Path::new(&config.csv_path);
    let schema = Schema::from_config(config)?;

    let existing = if path.exists() {
        CsvSink::inspect(path, &schema)?
    } else {
        Default::default()
    };

    Ok(OutputStats {
        path: config.csv_path.clone(),
        rows: existing.rows,
        distinct_keys: existing.distinct_keys(),
    })
}
