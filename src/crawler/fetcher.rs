//! HTTP fetch engine
//!
//! This module handles all page retrieval for the crawler, including:
//! - Choosing a proxy per attempt
//! - Classifying each attempt as success, retryable or terminal
//! - Bounded retry with an optional pause between attempts
//! - Decoding gzip/deflate bodies into text

use crate::config::Config;
use crate::crawler::proxy::{ProxyEndpoint, ProxySelector};
use crate::crawler::transport::{build_client, TransportConfig};
use crate::ConfigError;
use flate2::read::{GzDecoder, ZlibDecoder};
use reqwest::header::CONTENT_ENCODING;
use std::io::Read;
use std::time::Duration;

/// When to give up on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// HTTP status codes treated as transient
    pub retryable_codes: Vec<u16>,

    /// Pause before each retry; zero retries immediately
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retryable_codes: vec![403, 404, 408, 413, 500, 502, 503, 504],
            retry_delay: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    /// Builds the policy from the `[fetch]` configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.fetch.max_retries,
            retryable_codes: config.fetch.retry_codes.clone(),
            retry_delay: Duration::from_millis(config.fetch.retry_delay_ms),
        }
    }

    /// Total tries per page, the first attempt included
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    pub fn is_retryable_status(&self, status_code: u16) -> bool {
        self.retryable_codes.contains(&status_code)
    }
}

/// One attempt at fetching a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,

    /// Zero-based attempt number
    pub attempt: u32,

    /// Proxy chosen for this attempt
    pub proxy: Option<ProxyEndpoint>,
}

impl FetchRequest {
    /// The first attempt for a URL
    pub fn new(url: impl Into<String>, proxy: Option<ProxyEndpoint>) -> Self {
        Self {
            url: url.into(),
            attempt: 0,
            proxy,
        }
    }

    /// The attempt that follows this one, with a newly chosen proxy
    pub fn next_attempt(&self, proxy: Option<ProxyEndpoint>) -> Self {
        Self {
            url: self.url.clone(),
            attempt: self.attempt + 1,
            proxy,
        }
    }
}

/// Classified result of a single attempt
#[derive(Debug)]
pub enum FetchOutcome {
    /// The server answered with a non-error status
    Success {
        /// Raw body bytes as received
        body: Vec<u8>,
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Lowercased Content-Encoding header, if any
        content_encoding: Option<String>,
    },

    /// Network failure or a status listed as retryable
    RetryableFailure { reason: String },

    /// A status that further attempts will not change
    TerminalFailure { status_code: u16, reason: String },
}

/// Why a page produced no content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Every attempt failed transiently
    RetriesExhausted { last_error: String },

    /// The server answered with a non-retryable error status
    Rejected { status_code: u16 },
}

/// Result of a complete fetch, retries included
#[derive(Debug)]
pub enum FetchResult {
    /// The page was fetched and decoded
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Decoded page text
        body: String,
        /// Attempts used, the successful one included
        attempts: u32,
    },

    /// No content; the crawl moves on without a record
    Failed { reason: FailureReason, attempts: u32 },
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Number of attempts made
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. } | Self::Failed { attempts, .. } => *attempts,
        }
    }
}

/// Fetches pages with proxy rotation and bounded retry
#[derive(Debug, Clone)]
pub struct Fetcher {
    transport: TransportConfig,
    proxies: ProxySelector,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(transport: TransportConfig, proxies: ProxySelector, policy: RetryPolicy) -> Self {
        Self {
            transport,
            proxies,
            policy,
        }
    }

    /// Builds a fetcher from headers, proxies and `[fetch]` settings
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(
            TransportConfig::from_config(config)?,
            ProxySelector::from_config(&config.proxies),
            RetryPolicy::from_config(config),
        ))
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn proxies(&self) -> &ProxySelector {
        &self.proxies
    }

    /// Fetches a URL, retrying transient failures
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx / 3xx after redirects | Decode body → Success |
    /// | Status in `retryable_codes` | Retry with a new proxy |
    /// | Other 4xx / 5xx | Stop → Failed (Rejected) |
    /// | Connect error, timeout, DNS, body read | Retry with a new proxy |
    /// | `max_retries` retries used | Stop → Failed (RetriesExhausted) |
    ///
    /// At most `1 + max_retries` requests are made. Each retry picks a
    /// proxy at random again.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch
    ///
    /// # Returns
    ///
    /// A FetchResult carrying the decoded page or the reason it failed
    pub async fn fetch(&self, url: &str) -> FetchResult {
        let mut request = FetchRequest::new(url, self.proxies.select().cloned());

        loop {
            let attempts = request.attempt + 1;
            tracing::info!(
                "Fetching data from: {} (attempt {}/{})",
                url,
                attempts,
                self.policy.max_attempts()
            );

            match self.attempt(&request).await {
                FetchOutcome::Success {
                    body,
                    final_url,
                    status_code,
                    content_encoding,
                } => {
                    if final_url != url {
                        tracing::info!("Redirected URL: {}", final_url);
                    }
                    let body = decode_body(&body, content_encoding.as_deref());
                    return FetchResult::Success {
                        final_url,
                        status_code,
                        body,
                        attempts,
                    };
                }

                FetchOutcome::TerminalFailure {
                    status_code,
                    reason,
                } => {
                    tracing::error!("Giving up on {}: {}", url, reason);
                    return FetchResult::Failed {
                        reason: FailureReason::Rejected { status_code },
                        attempts,
                    };
                }

                FetchOutcome::RetryableFailure { reason } => {
                    if request.attempt >= self.policy.max_retries {
                        tracing::error!(
                            "Giving up on {} after {} attempts: {}",
                            url,
                            attempts,
                            reason
                        );
                        return FetchResult::Failed {
                            reason: FailureReason::RetriesExhausted { last_error: reason },
                            attempts,
                        };
                    }

                    tracing::warn!("Attempt {} for {} failed: {}", attempts, url, reason);

                    if !self.policy.retry_delay.is_zero() {
                        tokio::time::sleep(self.policy.retry_delay).await;
                    }

                    request = request.next_attempt(self.proxies.select().cloned());
                }
            }
        }
    }

    /// Makes a single attempt and classifies the result
    pub async fn attempt(&self, request: &FetchRequest) -> FetchOutcome {
        if let Some(proxy) = &request.proxy {
            tracing::info!("Proxy: {}", proxy);
        }

        let client = match build_client(&self.transport, request.proxy.as_ref()) {
            Ok(client) => client,
            Err(e) => {
                return FetchOutcome::RetryableFailure {
                    reason: format!("Failed to build HTTP client: {}", e),
                }
            }
        };

        let response = match client.get(&request.url).send().await {
            Ok(response) => response,
            Err(e) => {
                return FetchOutcome::RetryableFailure {
                    reason: describe_transport_error(&e),
                }
            }
        };

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let status_code = status.as_u16();
            let reason = format!(
                "HTTP {} {}",
                status_code,
                status.canonical_reason().unwrap_or("Unknown Status")
            );
            tracing::error!("Http error for {}: {}", request.url, reason);

            return if self.policy.is_retryable_status(status_code) {
                FetchOutcome::RetryableFailure { reason }
            } else {
                FetchOutcome::TerminalFailure {
                    status_code,
                    reason,
                }
            };
        }

        let final_url = response.url().to_string();
        let content_encoding = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_ascii_lowercase());

        match response.bytes().await {
            Ok(body) => FetchOutcome::Success {
                body: body.to_vec(),
                final_url,
                status_code: status.as_u16(),
                content_encoding,
            },
            Err(e) => FetchOutcome::RetryableFailure {
                reason: format!("Failed to read response body: {}", e),
            },
        }
    }
}

fn describe_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("Request timeout: {}", error)
    } else if error.is_connect() {
        format!("Failed to reach server: {}", error)
    } else if error.is_redirect() {
        format!("Redirect error: {}", error)
    } else {
        format!("Request failed: {}", error)
    }
}

/// Decodes a response body into text
///
/// Gzip and deflate bodies are decompressed first. Invalid UTF-8 is
/// replaced rather than rejected, and a body that fails to decompress is
/// decoded as-is, so this never fails.
pub fn decode_body(body: &[u8], content_encoding: Option<&str>) -> String {
    let decompressed = match content_encoding {
        Some("gzip") | Some("x-gzip") => decompress(GzDecoder::new(body)),
        Some("deflate") => decompress(ZlibDecoder::new(body)),
        _ => return String::from_utf8_lossy(body).into_owned(),
    };

    match decompressed {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::warn!("Failed to decompress response body, using raw bytes: {}", e);
            String::from_utf8_lossy(body).into_owned()
        }
    }
}

fn decompress(mut reader: impl Read) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    reader.read_to_end(&mut out)?;
    Ok(out)
}
