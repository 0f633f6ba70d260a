//! Proxy pool and per-request proxy selection

use crate::config::ProxyEntry;
use rand::seq::IndexedRandom;
use reqwest::Proxy;
use std::fmt;

/// A forwarding proxy the crawler may route requests through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    pub host: String,
    pub port: u16,

    /// HTTPS-capable proxies carry every request; plain ones only `http://` targets
    pub https: bool,
}

impl ProxyEndpoint {
    pub fn new(host: impl Into<String>, port: u16, https: bool) -> Self {
        Self {
            host: host.into(),
            port,
            https,
        }
    }

    /// Address the client connects to
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Builds the reqwest proxy rule for this endpoint
    pub fn to_proxy(&self) -> Result<Proxy, reqwest::Error> {
        if self.https {
            Proxy::all(self.url())
        } else {
            Proxy::http(self.url())
        }
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.https { "https" } else { "http" };
        write!(f, "{}:{} ({})", self.host, self.port, scheme)
    }
}

impl From<&ProxyEntry> for ProxyEndpoint {
    fn from(entry: &ProxyEntry) -> Self {
        Self::new(entry.host.clone(), entry.port, entry.https)
    }
}

/// Picks a proxy uniformly at random for every request attempt
///
/// There is no stickiness and no health tracking: a proxy that just
/// failed is as likely to be picked again as any other.
#[derive(Debug, Clone, Default)]
pub struct ProxySelector {
    pool: Vec<ProxyEndpoint>,
}

impl ProxySelector {
    pub fn new(pool: Vec<ProxyEndpoint>) -> Self {
        Self { pool }
    }

    /// Builds a selector from the configured proxy list
    pub fn from_config(entries: &[ProxyEntry]) -> Self {
        Self::new(entries.iter().map(ProxyEndpoint::from).collect())
    }

    /// Returns a random proxy, or `None` to connect directly
    pub fn select(&self) -> Option<&ProxyEndpoint> {
        let proxy = self.pool.choose(&mut rand::rng());
        if let Some(proxy) = proxy {
            tracing::debug!("Proxy: {}", proxy);
        }
        proxy
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn endpoints(&self) -> &[ProxyEndpoint] {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_empty_pool_selects_none() {
        let selector = ProxySelector::default();
        assert!(selector.is_empty());
        assert_eq!(selector.select(), None);
    }

    #[test]
    fn test_single_proxy_always_selected() {
        let proxy = ProxyEndpoint::new("10.0.0.1", 8080, false);
        let selector = ProxySelector::new(vec![proxy.clone()]);

        for _ in 0..20 {
            assert_eq!(selector.select(), Some(&proxy));
        }
    }

    #[test]
    fn test_selection_covers_pool() {
        let selector = ProxySelector::new(vec![
            ProxyEndpoint::new("10.0.0.1", 8080, false),
            ProxyEndpoint::new("10.0.0.2", 8080, true),
            ProxyEndpoint::new("10.0.0.3", 3128, false),
        ]);

        let seen: HashSet<String> = (0..1000)
            .filter_map(|_| selector.select().map(|p| p.host.clone()))
            .collect();

        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_from_config() {
        let entries = vec![
            ProxyEntry {
                host: "10.0.0.1".to_string(),
                port: 8080,
                https: true,
            },
            ProxyEntry {
                host: "10.0.0.2".to_string(),
                port: 3128,
                https: false,
            },
        ];

        let selector = ProxySelector::from_config(&entries);
        assert_eq!(selector.len(), 2);
        assert_eq!(
            selector.endpoints()[0],
            ProxyEndpoint::new("10.0.0.1", 8080, true)
        );
    }

    #[test]
    fn test_proxy_url_and_display() {
        let proxy = ProxyEndpoint::new("10.0.0.1", 8080, true);
        assert_eq!(proxy.url(), "http://10.0.0.1:8080");
        assert_eq!(proxy.to_string(), "10.0.0.1:8080 (https)");
        assert!(proxy.to_proxy().is_ok());

        let plain = ProxyEndpoint::new("10.0.0.2", 3128, false);
        assert!(plain.to_proxy().is_ok());
    }
}
