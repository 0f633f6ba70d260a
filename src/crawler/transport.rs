//! HTTP client construction
//!
//! A fresh client is built for every request attempt so that each attempt
//! gets its own proxy and its own cookie jar.

use crate::config::Config;
use crate::crawler::proxy::ProxyEndpoint;
use crate::ConfigError;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONNECTION,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use reqwest::{redirect::Policy, Client};
use std::collections::BTreeMap;
use std::time::Duration;

/// Browser identity sent when no headers are configured
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/69.0.3497.100 Safari/537.36";

const DEFAULT_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8";

/// Only encodings the fetcher knows how to decode are advertised
const DEFAULT_ACCEPT_ENCODING: &str = "gzip, deflate";

const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Maximum redirect hops followed per request
pub const MAX_REDIRECTS: usize = 10;

/// Settings shared by every client the fetcher builds
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Headers sent with every request
    pub headers: HeaderMap,

    /// Connect and overall request timeout
    pub timeout: Duration,

    /// Redirect hops followed before giving up
    pub max_redirects: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            headers: default_headers(),
            timeout: Duration::from_secs(60),
            max_redirects: MAX_REDIRECTS,
        }
    }
}

impl TransportConfig {
    /// Builds transport settings from the configuration
    ///
    /// A `[headers]` table replaces the default header set entirely.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let headers = match &config.headers {
            Some(headers) => header_map(headers)?,
            None => default_headers(),
        };

        Ok(Self {
            headers,
            timeout: Duration::from_secs(config.fetch.timeout_secs),
            max_redirects: MAX_REDIRECTS,
        })
    }
}

/// The built-in browser-like header set
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
    headers.insert(
        ACCEPT_ENCODING,
        HeaderValue::from_static(DEFAULT_ACCEPT_ENCODING),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE),
    );
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers
}

/// Converts configured header strings into a header map
pub fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, ConfigError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::Validation(format!("Invalid header name '{}'", name)))?;
        let value = HeaderValue::from_str(value).map_err(|_| {
            ConfigError::Validation(format!("Invalid value for header '{}'", name))
        })?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Builds an HTTP client for a single request attempt
///
/// # Arguments
///
/// * `config` - Headers, timeout and redirect limit
/// * `proxy` - Proxy to route through, or `None` for a direct connection
///
/// # Returns
///
/// * `Ok(Client)` - Client with a fresh cookie jar
/// * `Err(reqwest::Error)` - The proxy or TLS backend could not be set up
pub fn build_client(
    config: &TransportConfig,
    proxy: Option<&ProxyEndpoint>,
) -> Result<Client, reqwest::Error> {
    let builder = Client::builder()
        .default_headers(config.headers.clone())
        .cookie_store(true)
        .redirect(Policy::limited(config.max_redirects))
        .timeout(config.timeout)
        .connect_timeout(config.timeout);

    let builder = match proxy {
        Some(proxy) => builder.proxy(proxy.to_proxy()?),
        // Environment proxies are ignored: no proxy means a direct connection
        None => builder.no_proxy(),
    };

    builder.build()
}
