//! CSV output sink
//!
//! Records are appended to a CSV file whose first row holds the schema's
//! display names. Every field is quoted. Reopening an existing file
//! resumes it: the header is checked against the schema and the existing
//! rows are counted.

use crate::storage::record::{OutputRecord, Schema};
use crate::storage::traits::{RecordSink, SinkError, SinkResult};
use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Rows found in an existing output file
#[derive(Debug, Clone, Default)]
pub struct ExistingOutput {
    /// Whether the file already starts with a header row
    pub has_header: bool,

    /// Number of data rows (header excluded)
    pub rows: u64,

    /// Key column of every data row that has one, in file order
    pub keys: Vec<String>,
}

impl ExistingOutput {
    /// Number of distinct keys
    pub fn distinct_keys(&self) -> usize {
        self.keys.iter().collect::<HashSet<_>>().len()
    }
}

/// Storage a `CsvSink` appends to
///
/// Every row reaches the target in one `write_all`. A row that fails
/// partway is cut back off with `truncate`, so the target only ever holds
/// complete rows.
pub trait AppendTarget: Write + Send {
    /// Current length in bytes
    fn end(&mut self) -> std::io::Result<u64>;

    /// Drops everything past `len`
    fn truncate(&mut self, len: u64) -> std::io::Result<()>;
}

impl AppendTarget for File {
    fn end(&mut self) -> std::io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        // Opened in append mode, so later writes land at the new end
        self.set_len(len)
    }
}

/// Append-only CSV sink
pub struct CsvSink<T: AppendTarget = File> {
    path: PathBuf,
    schema: Schema,
    target: T,
    count: u64,
}

impl CsvSink<File> {
    /// Opens or creates the output file
    ///
    /// A missing or empty file gets a header row. An existing file must
    /// start with the schema's header; its rows seed `count`.
    ///
    /// # Errors
    ///
    /// * `SinkError::SchemaMismatch` - the existing header differs from the schema
    /// * `SinkError::Io` / `SinkError::Csv` - the file cannot be read or written
    pub fn open(path: &Path, schema: Schema) -> SinkResult<Self> {
        let has_content = path.metadata().map(|m| m.len() > 0).unwrap_or(false);

        let existing = if has_content {
            inspect_existing(path, &schema)?
        } else {
            ExistingOutput::default()
        };
        tracing::debug!(
            "Found {} existing rows in {}",
            existing.rows,
            path.display()
        );

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        if has_content {
            ensure_trailing_newline(&mut file)?;
        }

        let mut sink = Self::with_target(path, schema, file, existing.rows);
        if !existing.has_header {
            let header = encode_row(&sink.schema.display_names())?;
            sink.append(&header)?;
        }

        Ok(sink)
    }

    /// Reads an existing output file without opening it for writing
    pub fn inspect(path: &Path, schema: &Schema) -> SinkResult<ExistingOutput> {
        inspect_existing(path, schema)
    }
}

impl<T: AppendTarget> CsvSink<T> {
    /// Wraps an already positioned target holding `count` data rows
    pub fn with_target(path: &Path, schema: Schema, target: T, count: u64) -> Self {
        Self {
            path: path.to_path_buf(),
            schema,
            target,
            count,
        }
    }

    /// Path of the output file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_ref(&self) -> &T {
        &self.target
    }

    /// Writes one encoded row, removing any part of it on failure
    fn append(&mut self, bytes: &[u8]) -> SinkResult<()> {
        let before = self.target.end()?;

        let written = self
            .target
            .write_all(bytes)
            .and_then(|()| self.target.flush());

        if let Err(e) = written {
            if let Err(rollback) = self.target.truncate(before) {
                tracing::error!(
                    "Failed to roll back partial row in {}: {}",
                    self.path.display(),
                    rollback
                );
            }
            return Err(e.into());
        }
        Ok(())
    }
}

impl<T: AppendTarget> RecordSink for CsvSink<T> {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn load_existing_keys(&mut self) -> SinkResult<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        Ok(inspect_existing(&self.path, &self.schema)?.keys)
    }

    fn write(&mut self, record: &OutputRecord) -> SinkResult<()> {
        let row = encode_row(&self.schema.row(record)?)?;
        self.append(&row)?;
        self.count += 1;
        Ok(())
    }

    fn count(&self) -> u64 {
        self.count
    }
}

/// Encodes one fully quoted CSV row, line terminator included
fn encode_row(fields: &[&str]) -> SinkResult<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Always)
        .from_writer(Vec::new());
    writer.write_record(fields)?;
    writer
        .into_inner()
        .map_err(|e| SinkError::Io(std::io::Error::new(e.error().kind(), e.error().to_string())))
}

fn inspect_existing(path: &Path, schema: &Schema) -> SinkResult<ExistingOutput> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let found: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let expected: Vec<String> = schema
        .display_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    // An empty file has no header yet
    if found.is_empty() {
        return Ok(ExistingOutput::default());
    }

    if found != expected {
        return Err(SinkError::SchemaMismatch { expected, found });
    }

    let key_index = schema.key_index();
    let mut existing = ExistingOutput {
        has_header: true,
        ..ExistingOutput::default()
    };

    for result in reader.records() {
        let row = result?;
        existing.rows += 1;
        match row.get(key_index).filter(|k| !k.is_empty()) {
            Some(key) => existing.keys.push(key.to_string()),
            None => tracing::warn!(
                "Row {} of {} has no key value",
                existing.rows,
                path.display()
            ),
        }
    }

    Ok(existing)
}

/// Terminates a partially written last line so the next row starts cleanly
fn ensure_trailing_newline(file: &mut File) -> SinkResult<()> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(());
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        file.write_all(b"\n")?;
    }
    Ok(())
}
