//! Tabular data model shared by the projector, the engine, and exporters.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Synthetic positional identifier column.
pub const FEATURE_ID_HEADER: &str = "Feature ID";

/// Synthetic geometry type column.
pub const GEOMETRY_TYPE_HEADER: &str = "Geometry Type";

/// A table row: header → display value.
pub type Row = HashMap<String, String>;

/// Headers plus rows.
///
/// Headers are unique. A row may lack a key for a header; readers treat the
/// missing key as the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    /// Creates a table.
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if `column` is a header.
    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    /// Position of a header.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    /// Resolves a column reference: exact match first, then case-insensitive.
    pub fn resolve_column(&self, column: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.as_str() == column)
            .or_else(|| self.headers.iter().find(|h| h.eq_ignore_ascii_case(column)))
            .map(String::as_str)
    }

    /// Cell value, empty when the key is missing; `None` when the row does
    /// not exist.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        self.rows
            .get(row)
            .map(|r| r.get(column).map(String::as_str).unwrap_or(""))
    }

    /// Values of one column across all rows, in row order.
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.rows
            .iter()
            .map(move |r| r.get(column).map(String::as_str).unwrap_or(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut a = Row::new();
        a.insert("Name".to_string(), "Blue Bottle".to_string());
        let b = Row::new();
        Table::new(vec!["Name".to_string(), "Rating".to_string()], vec![a, b])
    }

    #[test]
    fn test_missing_cells_read_as_empty() {
        let table = sample();
        assert_eq!(table.cell(0, "Name"), Some("Blue Bottle"));
        assert_eq!(table.cell(1, "Name"), Some(""));
        assert_eq!(table.cell(5, "Name"), None);
        assert_eq!(
            table.column_values("Rating").collect::<Vec<_>>(),
            vec!["", ""]
        );
    }

    #[test]
    fn test_resolve_column() {
        let table = sample();
        assert_eq!(table.resolve_column("Name"), Some("Name"));
        assert_eq!(table.resolve_column("rating"), Some("Rating"));
        assert_eq!(table.resolve_column("Count"), None);
        assert_eq!(table.column_index("Rating"), Some(1));
    }
}
