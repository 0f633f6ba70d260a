use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Count of records written, shared by every worker
///
/// Starts at the number of rows found in earlier output and only ever
/// grows. Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct ProgressCounter {
    value: Arc<AtomicU64>,
}

impl ProgressCounter {
    /// Creates a counter starting at `initial`
    pub fn new(initial: u64) -> Self {
        Self {
            value: Arc::new(AtomicU64::new(initial)),
        }
    }

    /// Adds one and returns the new total
    pub fn increment(&self) -> u64 {
        self.value.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Current total
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }
}
