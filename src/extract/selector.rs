//! CSS selector extraction driven by the `[extract]` configuration

use crate::config::{ExtractConfig, ExtractField};
use crate::extract::{Extractor, Page};
use crate::storage::OutputRecord;
use crate::url::resolve_link;
use crate::ConfigError;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// A compiled `[[extract.field]]` rule
#[derive(Debug)]
struct FieldRule {
    name: String,
    selector: Selector,
    attribute: Option<String>,
    pattern: Option<Regex>,
    resolve_url: bool,
}

impl FieldRule {
    fn compile(field: &ExtractField) -> Result<Self, ConfigError> {
        let pattern = field
            .pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| ConfigError::InvalidSelector(format!("pattern for '{}': {}", field.name, e)))?;

        Ok(Self {
            name: field.name.clone(),
            selector: parse_selector(&field.selector)?,
            attribute: field.attribute.clone(),
            pattern,
            resolve_url: field.resolve_url,
        })
    }

    /// Pulls this field's value out of an item element
    fn apply(&self, item: ElementRef<'_>, base_url: &str) -> Option<String> {
        let element = item.select(&self.selector).next()?;

        let raw = match &self.attribute {
            Some(attribute) => element.value().attr(attribute)?.trim().to_string(),
            None => element.text().collect::<String>().trim().to_string(),
        };

        let value = match &self.pattern {
            Some(pattern) => {
                let captures = pattern.captures(&raw)?;
                captures
                    .get(1)
                    .or_else(|| captures.get(0))?
                    .as_str()
                    .trim()
                    .to_string()
            }
            None => raw,
        };

        if value.is_empty() {
            return None;
        }

        if self.resolve_url {
            resolve_link(base_url, &value)
        } else {
            Some(value)
        }
    }
}

/// Extracts one record per element matching the item selector
///
/// Each field takes the first match of its selector inside the item, the
/// trimmed text or the named attribute, optionally narrowed by a regex.
/// Items without a value for the key field are dropped.
#[derive(Debug)]
pub struct SelectorExtractor {
    item: Selector,
    fields: Vec<FieldRule>,
    key_field: String,
}

impl SelectorExtractor {
    /// Compiles the extraction rules
    ///
    /// # Arguments
    ///
    /// * `config` - The `[extract]` table
    /// * `key_field` - The output field records are deduplicated by
    pub fn from_config(config: &ExtractConfig, key_field: &str) -> Result<Self, ConfigError> {
        let fields = config
            .fields
            .iter()
            .map(FieldRule::compile)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            item: parse_selector(&config.item)?,
            fields,
            key_field: key_field.to_string(),
        })
    }
}

impl Extractor for SelectorExtractor {
    fn extract(&self, page: &Page) -> Vec<OutputRecord> {
        let document = Html::parse_document(&page.body);
        let mut records = Vec::new();

        for item in document.select(&self.item) {
            let mut record = OutputRecord::new();
            for rule in &self.fields {
                if let Some(value) = rule.apply(item, &page.final_url) {
                    record.insert(rule.name.clone(), value);
                }
            }

            match record.get(&self.key_field) {
                Some(key) if !key.is_empty() => records.push(record),
                _ => tracing::debug!(
                    "Skipping item without '{}' on {}",
                    self.key_field,
                    page.final_url
                ),
            }
        }

        tracing::debug!("Extracted {} records from {}", records.len(), page.final_url);
        records
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("selector '{}': {:?}", selector, e)))
}
