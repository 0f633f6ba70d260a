//! Crawler module for page fetching and record collection
//!
//! This module contains the core crawling logic, including:
//! - HTTP client construction and proxy rotation
//! - Fetching with bounded retry
//! - Deduplicated record collection
//! - Overall crawl coordination

mod collector;
mod coordinator;
mod fetcher;
mod proxy;
mod transport;

pub use collector::{Collector, OfferOutcome};
pub use coordinator::{run_crawl, Coordinator};
pub use fetcher::{
    decode_body, FailureReason, FetchOutcome, FetchRequest, FetchResult, Fetcher, RetryPolicy,
};
pub use proxy::{ProxyEndpoint, ProxySelector};
pub use transport::{build_client, default_headers, header_map, TransportConfig};

pub use crate::output::CrawlReport;
