//! Deduplicating record collector
//!
//! All workers hand their records to a single `Collector`. The dedup
//! check, the sink write and the counter increment happen under one
//! lock, so a key is written at most once per output file and the
//! counter always equals the number of data rows in it.

use crate::state::{DedupCache, ProgressCounter};
use crate::storage::{OutputRecord, RecordSink, SinkError, SinkResult};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// What happened to an offered record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    /// Persisted; `total` is the record count after this write
    Written { total: u64 },

    /// Its key was already persisted
    Duplicate,
}

struct Inner {
    cache: DedupCache,
    sink: Box<dyn RecordSink>,
}

/// Serializes record persistence across workers
pub struct Collector {
    inner: Mutex<Inner>,
    progress: ProgressCounter,
}

impl Collector {
    /// Opens a collector over a sink, seeding state from its existing rows
    pub fn open(mut sink: Box<dyn RecordSink>) -> SinkResult<Self> {
        let keys = sink.load_existing_keys()?;
        let cache = DedupCache::from_keys(keys);
        let previous = sink.count();

        tracing::info!("Total previous records found: {}", previous);
        tracing::debug!("{} distinct keys loaded", cache.len());

        Ok(Self {
            inner: Mutex::new(Inner { cache, sink }),
            progress: ProgressCounter::new(previous),
        })
    }

    /// Persists a record unless its key was seen before
    ///
    /// A record whose write fails is not remembered, so a later offer of
    /// the same key tries again.
    pub fn offer(&self, record: &OutputRecord) -> SinkResult<OfferOutcome> {
        let mut inner = self.lock();
        let Inner { cache, sink } = &mut *inner;

        let key = record
            .key(sink.schema())
            .ok_or_else(|| SinkError::MissingKey(sink.schema().key_field().to_string()))?
            .to_string();

        if cache.contains(&key) {
            tracing::warn!("Skipping duplicate record: {}", key);
            return Ok(OfferOutcome::Duplicate);
        }

        sink.write(record)?;
        cache.insert(key);
        let total = self.progress.increment();

        Ok(OfferOutcome::Written { total })
    }

    /// Records persisted so far, previous runs included
    pub fn count(&self) -> u64 {
        self.progress.get()
    }

    /// A handle onto the shared counter
    pub fn progress(&self) -> ProgressCounter {
        self.progress.clone()
    }

    /// Whether a key has already been persisted
    pub fn seen(&self, key: &str) -> bool {
        self.lock().cache.contains(key)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The cache is only updated after a successful write, so a poisoned lock is still consistent
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
