//! Small cell formulas: `=SUM(column)` and `=AVERAGE(column)`.
//!
//! Formulas are evaluated at display/summary time and never written back
//! into the cell. Anything that is not a recognized formula is returned
//! unchanged.

use crate::table::Table;
use regex::Regex;
use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;

fn formula_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^=(SUM|AVERAGE)\(([^)]+)\)$").expect("formula pattern is valid")
    })
}

/// Aggregate function of a formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Average,
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregate::Sum => write!(f, "SUM"),
            Aggregate::Average => write!(f, "AVERAGE"),
        }
    }
}

/// A parsed column aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
    pub aggregate: Aggregate,
    pub column: String,
}

impl Formula {
    /// Parses a cell value; `None` when it is not a formula.
    ///
    /// A blank column name such as `=SUM( )` still parses and names no
    /// column, so it evaluates to `"0"`.
    pub fn parse(value: &str) -> Option<Self> {
        let captures = formula_pattern().captures(value)?;
        let aggregate = if captures[1].eq_ignore_ascii_case("SUM") {
            Aggregate::Sum
        } else {
            Aggregate::Average
        };
        Some(Self {
            aggregate,
            column: captures[2].trim().to_string(),
        })
    }

    /// Evaluates against a table.
    ///
    /// Only cells that parse as finite numbers participate. An empty numeric
    /// set (including an unknown column) yields `"0"`.
    pub fn evaluate(&self, table: &Table) -> String {
        let values = numeric_values(table, &self.column);
        if values.is_empty() {
            return "0".to_string();
        }

        let sum: f64 = values.iter().sum();
        match self.aggregate {
            Aggregate::Sum => format!("{:.2}", sum),
            Aggregate::Average => format!("{:.2}", sum / values.len() as f64),
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "={}({})", self.aggregate, self.column)
    }
}

/// Numeric cells of a column, resolving the column name case-insensitively
/// when there is no exact header.
pub fn numeric_values(table: &Table, column: &str) -> Vec<f64> {
    if column.is_empty() {
        return Vec::new();
    }
    let Some(column) = table.resolve_column(column) else {
        return Vec::new();
    };
    table
        .column_values(column)
        .filter_map(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .collect()
}

/// Display value of a cell: the formula result, or the literal value.
pub fn evaluate_cell<'a>(value: &'a str, table: &Table) -> Cow<'a, str> {
    match Formula::parse(value) {
        Some(formula) => Cow::Owned(formula.evaluate(table)),
        None => Cow::Borrowed(value),
    }
}
