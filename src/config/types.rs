use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for Sumi-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Request headers; when present they replace the built-in browser headers
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default, rename = "proxy")]
    pub proxies: Vec<ProxyEntry>,
    pub output: OutputConfig,
    pub extract: ExtractConfig,
}

/// Crawl range and worker pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Page URL with a `{}` placeholder that receives the page index
    #[serde(rename = "url-template")]
    pub url_template: String,

    /// First page index to fetch
    #[serde(rename = "start-index")]
    pub start_index: u64,

    /// Last page index to fetch (inclusive)
    #[serde(rename = "end-index")]
    pub end_index: u64,

    /// Number of parallel workers
    pub workers: u32,
}

/// Retry and transport tuning
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Retries after the first attempt
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// HTTP status codes that are worth another attempt
    #[serde(rename = "retry-codes", default = "default_retry_codes")]
    pub retry_codes: Vec<u16>,

    /// Connect and read timeout per request (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Pause between attempts (milliseconds); zero retries immediately
    #[serde(rename = "retry-delay-ms", default)]
    pub retry_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_codes: default_retry_codes(),
            timeout_secs: default_timeout_secs(),
            retry_delay_ms: 0,
        }
    }
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_codes() -> Vec<u16> {
    vec![403, 404, 408, 413, 500, 502, 503, 504]
}

fn default_timeout_secs() -> u64 {
    60
}

/// A single proxy endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyEntry {
    pub host: String,
    pub port: u16,

    /// Whether the proxy can tunnel HTTPS traffic
    #[serde(default)]
    pub https: bool,
}

/// Output file and record schema
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the CSV file (created if missing, appended otherwise)
    #[serde(rename = "csv-path")]
    pub csv_path: String,

    /// Field whose value identifies a record for deduplication
    #[serde(rename = "key-field", default = "default_key_field")]
    pub key_field: String,

    /// Ordered output columns
    #[serde(rename = "field")]
    pub fields: Vec<OutputField>,
}

fn default_key_field() -> String {
    "url".to_string()
}

/// One output column
#[derive(Debug, Clone, Deserialize)]
pub struct OutputField {
    /// Field name used by the extractor
    pub name: String,

    /// Column title written to the header row
    pub display: String,
}

/// Selector-based extraction rules
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractConfig {
    /// CSS selector matching one element per record
    pub item: String,

    #[serde(rename = "field")]
    pub fields: Vec<ExtractField>,
}

/// How to pull one field out of an item element
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractField {
    /// Output field this value is stored under
    pub name: String,

    /// CSS selector relative to the item element
    pub selector: String,

    /// Attribute to read instead of the element text
    #[serde(default)]
    pub attribute: Option<String>,

    /// Regex applied to the value; the first capture group is kept
    #[serde(default)]
    pub pattern: Option<String>,

    /// Resolve the value against the page URL
    #[serde(rename = "resolve-url", default)]
    pub resolve_url: bool,
}
