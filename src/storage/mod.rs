//! Storage module for persisting harvested records
//!
//! This module handles:
//! - The output schema and record types
//! - The `RecordSink` trait for append-only stores
//! - A CSV implementation that doubles as the resume state of a crawl

mod csv_sink;
mod record;
mod traits;

pub use csv_sink::{CsvSink, ExistingOutput};
pub use record::{Column, OutputRecord, Schema};
pub use traits::{RecordSink, SinkError, SinkResult};

use crate::config::OutputConfig;
use std::path::Path;

impl Schema {
    /// Builds the schema described by the output configuration
    pub fn from_config(config: &OutputConfig) -> SinkResult<Self> {
        Schema::new(
            config
                .fields
                .iter()
                .map(|f| (f.name.clone(), f.display.clone())),
            config.key_field.clone(),
        )
    }
}

/// Opens the CSV sink described by the output configuration
///
/// # Arguments
///
/// * `config` - The output configuration
///
/// # Returns
///
/// * `Ok(CsvSink)` - Sink ready for appending, with prior rows counted
/// * `Err(SinkError)` - Invalid schema or unreadable/unwritable file
pub fn open_sink(config: &OutputConfig) -> SinkResult<CsvSink> {
    let schema = Schema::from_config(config)?;
    CsvSink::open(Path::new(&config.csv_path), schema)
}
