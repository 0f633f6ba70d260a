use std::collections::HashSet;

/// Keys of every record already persisted
///
/// The cache itself is not synchronized; it lives behind the collector's
/// lock together with the sink so that a membership check and the write
/// it guards happen as one step.
#[derive(Debug, Clone, Default)]
pub struct DedupCache {
    keys: HashSet<String>,
}

impl DedupCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache seeded with keys loaded from earlier output
    pub fn from_keys(keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    /// Returns true if the key has been seen
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Records a key, returning false if it was already present
    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        self.keys.insert(key.into())
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
