//! End-to-end crawl tests

use crate::{harvest_toml, listing_page};
use std::path::Path;
use sumi_harvest::config::parse_config;
use sumi_harvest::crawler::{run_crawl, Coordinator};
use sumi_harvest::storage::SinkError;
use sumi_harvest::HarvestError;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_listings(server: &MockServer, indices: impl IntoIterator<Item = u64>) {
    for index in indices {
        Mock::given(method("GET"))
            .and(path(format!("/page/{}/", index)))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(index)))
            .mount(server)
            .await;
    }
}

fn read_rows(csv: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(csv)
        .unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

#[tokio::test]
async fn test_sibling_duplicates_written_once() {
    let server = MockServer::start().await;
    mount_listings(&server, 1..=3).await;

    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("books.csv");
    let config = parse_config(&harvest_toml(&server, &csv, 1, 3, 2)).unwrap();

    let report = run_crawl(config).await.unwrap();

    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.records_written, 3);
    assert_eq!(report.duplicates_skipped, 3);
    assert_eq!(report.total_records, 3);

    let contents = std::fs::read_to_string(&csv).unwrap();
    assert_eq!(contents.lines().next(), Some("\"Name\",\"URL\""));

    let rows = read_rows(&csv);
    assert_eq!(rows.len(), 4);

    let mut urls: Vec<&str> = rows[1..].iter().map(|r| r[1].as_str()).collect();
    urls.sort();
    let base = server.uri();
    assert_eq!(
        urls,
        vec![
            format!("{}/book/1/", base),
            format!("{}/book/2/", base),
            format!("{}/book/3/", base),
        ]
    );
}

#[tokio::test]
async fn test_resumed_run_skips_existing_records() {
    let server = MockServer::start().await;
    mount_listings(&server, 1..=3).await;

    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("books.csv");

    let first = run_crawl(parse_config(&harvest_toml(&server, &csv, 1, 2, 2)).unwrap())
        .await
        .unwrap();
    assert_eq!(first.records_written, 2);
    assert_eq!(first.previous_records, 0);

    let second = run_crawl(parse_config(&harvest_toml(&server, &csv, 1, 3, 2)).unwrap())
        .await
        .unwrap();
    assert_eq!(second.previous_records, 2);
    assert_eq!(second.records_written, 1);
    assert_eq!(second.duplicates_skipped, 5);
    assert_eq!(second.total_records, 3);

    // One header, no repeated header, three data rows
    let rows = read_rows(&csv);
    assert_eq!(rows.len(), 4);
    assert_eq!(rows.iter().filter(|r| r[0] == "Name").count(), 1);
}

#[tokio::test]
async fn test_counter_counts_prior_rows_and_new_keys() {
    let server = MockServer::start().await;
    mount_listings(&server, 1..=2).await;

    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("books.csv");
    std::fs::write(
        &csv,
        "\"Name\",\"URL\"\n\"Old A\",\"https://elsewhere.example/a\"\n\"Old B\",\"https://elsewhere.example/b\"",
    )
    .unwrap();

    let report = run_crawl(parse_config(&harvest_toml(&server, &csv, 1, 2, 1)).unwrap())
        .await
        .unwrap();

    assert_eq!(report.previous_records, 2);
    assert_eq!(report.records_written, 2);
    assert_eq!(report.total_records, 4);

    // The missing newline after the last old row was repaired before appending
    let rows = read_rows(&csv);
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|r| r.len() == 2));
}

#[tokio::test]
async fn test_exhausted_page_produces_no_record() {
    let server = MockServer::start().await;
    mount_listings(&server, [1, 3]).await;
    Mock::given(method("GET"))
        .and(path("/page/2/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("books.csv");
    let report = run_crawl(parse_config(&harvest_toml(&server, &csv, 1, 3, 2)).unwrap())
        .await
        .unwrap();

    assert_eq!(report.pages_exhausted, 1);
    assert_eq!(report.pages_rejected, 0);
    assert_eq!(report.records_written, 2);

    let rows = read_rows(&csv);
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| !r[1].contains("/book/2/")));
}

#[tokio::test]
async fn test_rejected_page_is_not_retried() {
    let server = MockServer::start().await;
    mount_listings(&server, [1]).await;
    Mock::given(method("GET"))
        .and(path("/page/2/"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("books.csv");
    let report = run_crawl(parse_config(&harvest_toml(&server, &csv, 1, 2, 1)).unwrap())
        .await
        .unwrap();

    assert_eq!(report.pages_rejected, 1);
    assert_eq!(report.records_written, 1);
}

#[tokio::test]
async fn test_schema_mismatch_refuses_to_resume() {
    let server = MockServer::start().await;

    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("books.csv");
    std::fs::write(&csv, "\"Title\",\"Link\"\n\"A\",\"https://x/a\"\n").unwrap();

    let config = parse_config(&harvest_toml(&server, &csv, 1, 2, 1)).unwrap();
    let result = Coordinator::new(config);

    assert!(matches!(
        result,
        Err(HarvestError::Sink(SinkError::SchemaMismatch { .. }))
    ));

    // The existing file is left untouched
    let contents = std::fs::read_to_string(&csv).unwrap();
    assert_eq!(contents, "\"Title\",\"Link\"\n\"A\",\"https://x/a\"\n");
}

#[tokio::test]
async fn test_cancelled_before_start_fetches_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("books.csv");
    let coordinator =
        Coordinator::new(parse_config(&harvest_toml(&server, &csv, 1, 50, 4)).unwrap()).unwrap();

    coordinator.cancel_token().cancel();
    let report = coordinator.run().await.unwrap();

    assert!(report.cancelled);
    assert_eq!(report.pages_attempted, 0);

    // The header is written when the sink opens, even if nothing follows
    let rows = read_rows(&csv);
    assert_eq!(rows, vec![vec!["Name".to_string(), "URL".to_string()]]);
}
