//! Sink traits and error types
//!
//! This module defines the trait interface for output sinks and
//! associated error types.

use crate::storage::record::{OutputRecord, Schema};
use thiserror::Error;

/// Errors that can occur during sink operations
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Existing output header {found:?} does not match schema {expected:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Field '{0}' is not part of the output schema")]
    UnknownField(String),

    #[error("Record has no value for key field '{0}'")]
    MissingKey(String),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Trait for append-only record stores
///
/// A sink is not internally synchronized: callers that share one between
/// workers must serialize access (see `crawler::Collector`).
pub trait RecordSink: Send {
    /// The fixed schema every write follows
    fn schema(&self) -> &Schema;

    /// Returns the key of every record already persisted
    ///
    /// Used once at startup to seed the dedup cache.
    fn load_existing_keys(&mut self) -> SinkResult<Vec<String>>;

    /// Appends one record
    ///
    /// Either the whole row is persisted or the call fails; `count` only
    /// advances on success.
    fn write(&mut self, record: &OutputRecord) -> SinkResult<()>;

    /// Number of records persisted, including those found at startup
    fn count(&self) -> u64;
}
