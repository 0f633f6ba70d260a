//! State shared between crawl workers
//!
//! # Components
//!
//! - `DedupCache`: keys of records already persisted, seeded from earlier output
//! - `ProgressCounter`: lock-free count of persisted records

mod dedup;
mod progress;

// Re-export main types
pub use dedup::DedupCache;
pub use progress::ProgressCounter;
