//! Record extraction from fetched pages
//!
//! The crawler does not know how records are laid out on a page. It hands
//! every fetched page to an `Extractor` and offers whatever comes back to
//! the collector.

mod selector;

pub use selector::SelectorExtractor;

use crate::storage::OutputRecord;

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct Page {
    /// Index the page URL was expanded from
    pub index: u64,

    /// URL that was requested
    pub url: String,

    /// URL after redirects; relative links resolve against this
    pub final_url: String,

    /// Decoded page text
    pub body: String,
}

/// Turns a page into candidate records
///
/// Implementations must not fail: a page with nothing usable yields an
/// empty vector.
pub trait Extractor: Send + Sync {
    fn extract(&self, page: &Page) -> Vec<OutputRecord>;
}

impl<F> Extractor for F
where
    F: Fn(&Page) -> Vec<OutputRecord> + Send + Sync,
{
    fn extract(&self, page: &Page) -> Vec<OutputRecord> {
        self(page)
    }
}
