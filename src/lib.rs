//! Sumi-Harvest: a resumable fetch-and-collect crawler
//!
//! This crate fetches a numbered range of pages with retry and proxy
//! rotation, extracts records from them, and appends every record whose
//! key has not been seen before to a CSV file. Reruns pick up the
//! existing file and skip records that were already written.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Output sink error: {0}")]
    Sink(#[from] storage::SinkError),

    #[error("Worker pool failure: {0}")]
    WorkerPool(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector or pattern: {0}")]
    InvalidSelector(String),
}

/// Result type alias for Sumi-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlReport, FetchResult, Fetcher};
pub use storage::{CsvSink, OutputRecord, RecordSink, Schema};
