//! Export-ready table data for CSV, image, and PDF encoders.

use crate::formula::evaluate_cell;
use crate::table::Table;
use serde::{Deserialize, Serialize};

/// Headers plus rows in header order, with formulas evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExportData {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ExportData {
    pub fn from_table(title: impl Into<String>, table: &Table) -> Self {
        let rows = table
            .rows
            .iter()
            .map(|row| {
                table
                    .headers
                    .iter()
                    .map(|h| {
                        let value = row.get(h).map(String::as_str).unwrap_or("");
                        evaluate_cell(value, table).into_owned()
                    })
                    .collect()
            })
            .collect();

        Self {
            title: title.into(),
            headers: table.headers.clone(),
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
