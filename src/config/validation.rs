use crate::config::types::{
    Config, CrawlerConfig, ExtractConfig, FetchConfig, OutputConfig, ProxyEntry,
};
use crate::crawler::header_map;
use crate::url::expand_template;
use crate::ConfigError;
use regex::Regex;
use scraper::Selector;
use std::collections::{BTreeMap, HashSet};

const MAX_WORKERS: u32 = 256;
const MAX_RETRIES: u32 = 20;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetch_config(&config.fetch)?;
    if let Some(headers) = &config.headers {
        validate_headers(headers)?;
    }
    validate_proxies(&config.proxies)?;
    validate_output_config(&config.output)?;
    validate_extract_config(&config.extract, &config.output)?;
    Ok(())
}

/// Validates the crawl range and worker pool size
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.workers
        )));
    }

    if config.start_index > config.end_index {
        return Err(ConfigError::Validation(format!(
            "start-index ({}) must not exceed end-index ({})",
            config.start_index, config.end_index
        )));
    }

    if !config.url_template.contains("{}") {
        return Err(ConfigError::Validation(format!(
            "url-template must contain a '{{}}' placeholder, got '{}'",
            config.url_template
        )));
    }

    let sample = expand_template(&config.url_template, config.start_index).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "url-template '{}' does not produce a valid URL: {}",
            config.url_template, e
        ))
    })?;

    if sample.scheme() != "http" && sample.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "url-template must use http or https, got '{}'",
            sample.scheme()
        )));
    }

    Ok(())
}

/// Validates retry and timeout settings
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.max_retries > MAX_RETRIES {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= {}, got {}",
            MAX_RETRIES, config.max_retries
        )));
    }

    if let Some(code) = config
        .retry_codes
        .iter()
        .find(|code| !(400..=599).contains(*code))
    {
        return Err(ConfigError::Validation(format!(
            "retry-codes must be HTTP error codes (400-599), got {}",
            code
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates that every header can be sent as-is
fn validate_headers(headers: &BTreeMap<String, String>) -> Result<(), ConfigError> {
    header_map(headers).map(|_| ())
}

/// Validates proxy endpoints
fn validate_proxies(proxies: &[ProxyEntry]) -> Result<(), ConfigError> {
    for proxy in proxies {
        if proxy.host.trim().is_empty() {
            return Err(ConfigError::Validation(
                "proxy host cannot be empty".to_string(),
            ));
        }

        if proxy.host.contains("://") || proxy.host.contains('/') {
            return Err(ConfigError::Validation(format!(
                "proxy host must be a bare host name or address, got '{}'",
                proxy.host
            )));
        }

        if proxy.port == 0 {
            return Err(ConfigError::Validation(format!(
                "proxy port for '{}' cannot be 0",
                proxy.host
            )));
        }
    }
    Ok(())
}

/// Validates the output path and record schema
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.csv_path.is_empty() {
        return Err(ConfigError::Validation(
            "csv-path cannot be empty".to_string(),
        ));
    }

    if config.fields.is_empty() {
        return Err(ConfigError::Validation(
            "output must declare at least one field".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for field in &config.fields {
        if field.name.is_empty() {
            return Err(ConfigError::Validation(
                "output field name cannot be empty".to_string(),
            ));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate output field '{}'",
                field.name
            )));
        }
    }

    if !seen.contains(config.key_field.as_str()) {
        return Err(ConfigError::Validation(format!(
            "key-field '{}' is not one of the output fields",
            config.key_field
        )));
    }

    Ok(())
}

/// Validates selectors and patterns, and that every extracted field is an output column
fn validate_extract_config(
    config: &ExtractConfig,
    output: &OutputConfig,
) -> Result<(), ConfigError> {
    validate_selector(&config.item)?;

    if config.fields.is_empty() {
        return Err(ConfigError::Validation(
            "extract must declare at least one field".to_string(),
        ));
    }

    for field in &config.fields {
        if !output.fields.iter().any(|f| f.name == field.name) {
            return Err(ConfigError::Validation(format!(
                "extract field '{}' is not one of the output fields",
                field.name
            )));
        }

        validate_selector(&field.selector)?;

        if let Some(pattern) = &field.pattern {
            Regex::new(pattern).map_err(|e| {
                ConfigError::InvalidSelector(format!("pattern '{}': {}", pattern, e))
            })?;
        }
    }

    if !config.fields.iter().any(|f| f.name == output.key_field) {
        return Err(ConfigError::Validation(format!(
            "extract rules never produce the key field '{}'",
            output.key_field
        )));
    }

    Ok(())
}

fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("selector '{}': {:?}", selector, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{ExtractField, OutputField};

    fn create_test_config() -> Config {
        Config {
            crawler: CrawlerConfig {
                url_template: "https://example.com/page/{}/".to_string(),
                start_index: 1,
                end_index: 10,
                workers: 4,
            },
            fetch: FetchConfig::default(),
            headers: None,
            proxies: vec![],
            output: OutputConfig {
                csv_path: "out.csv".to_string(),
                key_field: "url".to_string(),
                fields: vec![
                    OutputField {
                        name: "name".to_string(),
                        display: "Name".to_string(),
                    },
                    OutputField {
                        name: "url".to_string(),
                        display: "URL".to_string(),
                    },
                ],
            },
            extract: ExtractConfig {
                item: "div.item".to_string(),
                fields: vec![ExtractField {
                    name: "url".to_string(),
                    selector: "a".to_string(),
                    attribute: Some("href".to_string()),
                    pattern: None,
                    resolve_url: true,
                }],
            },
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&create_test_config()).is_ok());
    }

    #[test]
    fn test_worker_bounds() {
        let mut config = create_test_config();
        config.crawler.workers = 0;
        assert!(validate(&config).is_err());

        config.crawler.workers = MAX_WORKERS + 1;
        assert!(validate(&config).is_err());

        config.crawler.workers = MAX_WORKERS;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_inverted_range() {
        let mut config = create_test_config();
        config.crawler.start_index = 11;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));

        config.crawler.start_index = 10;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_url_template() {
        let mut config = create_test_config();
        config.crawler.url_template = "https://example.com/page/".to_string();
        assert!(validate(&config).is_err());

        config.crawler.url_template = "ftp://example.com/{}".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        config.crawler.url_template = "not a url {}".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_retry_settings() {
        let mut config = create_test_config();
        config.fetch.max_retries = MAX_RETRIES + 1;
        assert!(validate(&config).is_err());

        let mut config = create_test_config();
        config.fetch.retry_codes = vec![500, 200];
        assert!(validate(&config).is_err());

        let mut config = create_test_config();
        config.fetch.timeout_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_headers() {
        let mut config = create_test_config();
        let mut headers = BTreeMap::new();
        headers.insert("Bad Header".to_string(), "x".to_string());
        config.headers = Some(headers);
        assert!(validate(&config).is_err());

        let mut headers = BTreeMap::new();
        headers.insert("X-Ok".to_string(), "line\nbreak".to_string());
        config.headers = Some(headers);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_proxy_validation() {
        let mut config = create_test_config();
        config.proxies = vec![ProxyEntry {
            host: "10.0.0.1".to_string(),
            port: 8080,
            https: false,
        }];
        assert!(validate(&config).is_ok());

        config.proxies[0].port = 0;
        assert!(validate(&config).is_err());

        config.proxies[0].port = 8080;
        config.proxies[0].host = "http://10.0.0.1".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_key_field_must_be_in_schema() {
        let mut config = create_test_config();
        config.output.key_field = "isbn".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_duplicate_output_field() {
        let mut config = create_test_config();
        config.output.fields.push(OutputField {
            name: "name".to_string(),
            display: "Other".to_string(),
        });
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_extract_field_must_be_in_schema() {
        let mut config = create_test_config();
        config.extract.fields.push(ExtractField {
            name: "price".to_string(),
            selector: "span".to_string(),
            attribute: None,
            pattern: None,
            resolve_url: false,
        });
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_selector_and_pattern() {
        let mut config = create_test_config();
        config.extract.item = "div[".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidSelector(_))
        ));

        let mut config = create_test_config();
        config.extract.fields[0].pattern = Some("(unclosed".to_string());
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_key_field_must_be_extracted() {
        let mut config = create_test_config();
        config.extract.fields[0].name = "name".to_string();
        assert!(validate(&config).is_err());
    }
}
