//! Output schema and record types

use crate::storage::traits::{SinkError, SinkResult};

/// A single output column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Field name used by extractors
    pub name: String,

    /// Title written to the header row
    pub display: String,
}

/// Ordered output columns plus the field that identifies a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
    key_field: String,
}

impl Schema {
    /// Creates a schema from `(name, display)` pairs
    ///
    /// # Errors
    ///
    /// Returns `SinkError::UnknownField` if `key_field` is not one of the columns.
    pub fn new<N, D>(
        columns: impl IntoIterator<Item = (N, D)>,
        key_field: impl Into<String>,
    ) -> SinkResult<Self>
    where
        N: Into<String>,
        D: Into<String>,
    {
        let columns: Vec<Column> = columns
            .into_iter()
            .map(|(name, display)| Column {
                name: name.into(),
                display: display.into(),
            })
            .collect();
        let key_field = key_field.into();

        if !columns.iter().any(|c| c.name == key_field) {
            return Err(SinkError::UnknownField(key_field));
        }

        Ok(Self { columns, key_field })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    /// Position of the key column
    pub fn key_index(&self) -> usize {
        self.columns
            .iter()
            .position(|c| c.name == self.key_field)
            .unwrap_or(0)
    }

    /// Header row titles, in column order
    pub fn display_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.display.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Lays a record out in column order
    ///
    /// Fields the record does not carry become empty strings.
    ///
    /// # Errors
    ///
    /// * `SinkError::UnknownField` - the record has a field with no column
    /// * `SinkError::MissingKey` - the record has no usable key
    pub fn row<'a>(&self, record: &'a OutputRecord) -> SinkResult<Vec<&'a str>> {
        if let Some((name, _)) = record.fields().iter().find(|(name, _)| !self.contains(name)) {
            return Err(SinkError::UnknownField(name.clone()));
        }

        if record.key(self).is_none() {
            return Err(SinkError::MissingKey(self.key_field.clone()));
        }

        Ok(self
            .columns
            .iter()
            .map(|c| record.get(&c.name).unwrap_or(""))
            .collect())
    }
}

/// An ordered set of named field values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputRecord {
    fields: Vec<(String, String)>,
}

impl OutputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets a field, replacing an earlier value with the same name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// The dedup key under `schema`, if present and non-empty
    pub fn key(&self, schema: &Schema) -> Option<&str> {
        self.get(schema.key_field()).filter(|k| !k.is_empty())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book_schema() -> Schema {
        Schema::new(
            [("name", "Name"), ("year", "Year"), ("url", "Map URL")],
            "url",
        )
        .unwrap()
    }

    #[test]
    fn test_schema_requires_key_column() {
        let result = Schema::new([("name", "Name")], "url");
        assert!(matches!(result, Err(SinkError::UnknownField(f)) if f == "url"));
    }

    #[test]
    fn test_schema_accessors() {
        let schema = book_schema();
        assert_eq!(schema.key_field(), "url");
        assert_eq!(schema.key_index(), 2);
        assert_eq!(schema.display_names(), vec!["Name", "Year", "Map URL"]);
        assert!(schema.contains("year"));
        assert!(!schema.contains("isbn"));
    }

    #[test]
    fn test_row_follows_schema_order() {
        let schema = book_schema();
        let record = OutputRecord::new()
            .with("url", "https://example.com/a")
            .with("name", "Book A");

        let row = schema.row(&record).unwrap();
        assert_eq!(row, vec!["Book A", "", "https://example.com/a"]);
    }

    #[test]
    fn test_row_rejects_unknown_field() {
        let schema = book_schema();
        let record = OutputRecord::new()
            .with("url", "https://example.com/a")
            .with("isbn", "123");

        assert!(matches!(schema.row(&record), Err(SinkError::UnknownField(f)) if f == "isbn"));
    }

    #[test]
    fn test_row_rejects_missing_or_empty_key() {
        let schema = book_schema();

        let record = OutputRecord::new().with("name", "No link");
        assert!(matches!(schema.row(&record), Err(SinkError::MissingKey(_))));

        let record = OutputRecord::new().with("url", "");
        assert!(matches!(schema.row(&record), Err(SinkError::MissingKey(_))));
    }

    #[test]
    fn test_insert_replaces_value() {
        let mut record = OutputRecord::new().with("name", "old");
        record.insert("name", "new");
        assert_eq!(record.get("name"), Some("new"));
        assert_eq!(record.fields().len(), 1);
    }
}
