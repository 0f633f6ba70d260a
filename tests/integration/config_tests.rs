//! Configuration loading against real files

use crate::{harvest_toml, listing_page};
use std::io::Write;
use sumi_harvest::config::{load_config, load_config_with_hash};
use sumi_harvest::crawler::run_crawl;
use sumi_harvest::ConfigError;
use tempfile::{NamedTempFile, TempDir};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_crawl_from_config_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(9)))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("books.csv");
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(harvest_toml(&server, &csv, 9, 9, 1).as_bytes())
        .unwrap();

    let (config, hash) = load_config_with_hash(file.path()).unwrap();
    assert_eq!(hash.len(), 64);
    assert_eq!(config.crawler.workers, 1);
    assert_eq!(config.fetch.max_retries, 2);

    let report = run_crawl(config).await.unwrap();
    assert_eq!(report.records_written, 1);
    assert!(csv.exists());
}

#[tokio::test]
async fn test_config_rejected_before_any_output() {
    let server = MockServer::start().await;

    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("books.csv");
    let toml = harvest_toml(&server, &csv, 1, 3, 1).replace("workers = 1", "workers = 0");

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(toml.as_bytes()).unwrap();

    assert!(matches!(
        load_config(file.path()),
        Err(ConfigError::Validation(_))
    ));
    assert!(!csv.exists());
}
