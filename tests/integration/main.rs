//! Integration tests for Sumi-Harvest
//!
//! These tests use wiremock to create mock HTTP servers and run complete
//! crawls against them, checking the CSV output on disk.

mod config_tests;
mod crawl_tests;

use std::path::Path;
use wiremock::MockServer;

/// Builds a configuration for a crawl of `/page/{}/` on the mock server
pub fn harvest_toml(server: &MockServer, csv: &Path, start: u64, end: u64, workers: u32) -> String {
    format!(
        r#"
[crawler]
url-template = "{uri}/page/{{}}/"
start-index = {start}
end-index = {end}
workers = {workers}

[fetch]
max-retries = 2
timeout-secs = 5

[output]
csv-path = '{csv}'
key-field = "url"

[[output.field]]
name = "name"
display = "Name"

[[output.field]]
name = "url"
display = "URL"

[extract]
item = "div.book"

[[extract.field]]
name = "name"
selector = "a.title"

[[extract.field]]
name = "url"
selector = "a.title"
attribute = "href"
resolve-url = true
"#,
        uri = server.uri(),
        csv = csv.display(),
    )
}

/// A listing page with one book that appears twice
pub fn listing_page(index: u64) -> String {
    format!(
        r#"<html><body>
<div class="book"><a class="title" href="/book/{index}/">Book {index}</a></div>
<div class="sidebar"><div class="book"><a class="title" href="/book/{index}/">Book {index}</a></div></div>
</body></html>"#
    )
}
