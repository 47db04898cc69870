//! Editable table engine.
//!
//! Owns one [`TableState`] per [`Category`], the active table, and the cell
//! selection. Every operation works on the active table. Row and column
//! operations with out-of-range indices or unknown columns are no-ops that
//! return `false`.
//!
//! Each table keeps an original snapshot used as the filter baseline and as
//! the reset target. The snapshot is recaptured only while the table is
//! unmodified; the first accepted mutation freezes it until [`TableEngine::reset`].

use crate::export::ExportData;
use crate::formula::{self, Aggregate, Formula};
use crate::table::{Row, Table, FEATURE_ID_HEADER};
use geosync_core::types::Category;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, trace};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Highlighted cell of the active table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    pub row: Option<usize>,
    pub column: Option<usize>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.row.is_none() && self.column.is_none()
    }
}

/// Where an outside click landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutsideClick {
    /// The click hit a header cell.
    pub on_header: bool,
    /// A context menu was open at the time of the click.
    pub context_menu_open: bool,
}

/// Change notifications produced by engine operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    TableModified {
        category: Category,
        modified: bool,
    },
    SelectionChanged {
        category: Category,
        selection: Selection,
    },
}

/// One table with its snapshot, modification flag, and column filters.
#[derive(Debug, Clone, Default)]
pub struct TableState {
    table: Table,
    original: Option<Table>,
    is_modified: bool,
    filters: HashMap<String, HashSet<String>>,
}

impl TableState {
    /// Current (possibly edited) table.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Rows captured before the first edit, if captured yet.
    pub fn original_rows(&self) -> Option<&[Row]> {
        self.original.as_ref().map(|t| t.rows.as_slice())
    }

    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    /// Allowed values of a filtered column; `None` means all values.
    pub fn filter_for(&self, column: &str) -> Option<&HashSet<String>> {
        self.filters.get(column)
    }

    fn capture_snapshot(&mut self) {
        if !self.is_modified {
            self.original = Some(self.table.clone());
        }
    }

    fn ensure_snapshot(&mut self) {
        if self.original.is_none() {
            self.original = Some(self.table.clone());
        }
    }

    fn baseline(&self) -> &Table {
        self.original.as_ref().unwrap_or(&self.table)
    }
}

/// Table engine over all categories.
#[derive(Debug, Clone)]
pub struct TableEngine {
    tables: Vec<TableState>,
    active: Category,
    selection: Selection,
    events: Vec<EngineEvent>,
}

impl Default for TableEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TableEngine {
    /// Creates an engine with an empty table per category.
    pub fn new() -> Self {
        Self {
            tables: Category::ALL.iter().map(|_| TableState::default()).collect(),
            active: Category::PointsOfInterest,
            selection: Selection::default(),
            events: Vec::new(),
        }
    }

    /// Replaces a category's table, dropping its edits and filters.
    pub fn set_table(&mut self, category: Category, table: Table) {
        let state = &mut self.tables[category.index()];
        state.table = table;
        state.original = None;
        state.is_modified = false;
        state.filters.clear();
        if category == self.active {
            state.capture_snapshot();
            self.set_selection(Selection::default());
        }
        debug!(
            category = %category,
            rows = self.tables[category.index()].table.row_count(),
            "Table loaded"
        );
    }

    pub fn active(&self) -> Category {
        self.active
    }

    pub fn state(&self, category: Category) -> &TableState {
        &self.tables[category.index()]
    }

    pub fn table(&self, category: Category) -> &Table {
        &self.tables[category.index()].table
    }

    pub fn active_table(&self) -> &Table {
        self.table(self.active)
    }

    /// All tables in category order.
    pub fn tables(&self) -> Vec<&Table> {
        self.tables.iter().map(|s| &s.table).collect()
    }

    pub fn is_modified(&self, category: Category) -> bool {
        self.tables[category.index()].is_modified
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Takes the events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    /// Switches the active table.
    ///
    /// The snapshot of the new table is recaptured only when it is
    /// unmodified. Selection is cleared.
    pub fn set_active_table(&mut self, category: Category) {
        self.active = category;
        self.tables[category.index()].capture_snapshot();
        self.set_selection(Selection::default());
        debug!(category = %category, "Active table changed");
    }

    /// Index-based variant of [`set_active_table`](Self::set_active_table).
    pub fn set_active_index(&mut self, index: usize) -> bool {
        match Category::from_index(index) {
            Some(category) => {
                self.set_active_table(category);
                true
            }
            None => false,
        }
    }

    /// Stores a raw cell value. Formulas are kept verbatim.
    pub fn edit_cell(&mut self, row: usize, column: &str, raw: impl Into<String>) -> bool {
        let state = &self.tables[self.active.index()];
        if row >= state.table.row_count() || !state.table.has_column(column) {
            return false;
        }

        let raw = raw.into();
        self.mutate(|table| {
            table.rows[row].insert(column.to_string(), raw);
        });
        trace!(row, column, "Cell edited");
        true
    }

    pub fn delete_row(&mut self, index: usize) -> bool {
        if index >= self.active_table().row_count() {
            return false;
        }

        self.mutate(|table| {
            table.rows.remove(index);
        });

        let mut selection = self.selection;
        match selection.row {
            Some(row) if row == index => selection = Selection::default(),
            Some(row) if row > index => selection.row = Some(row - 1),
            _ => {}
        }
        self.set_selection(selection);
        true
    }

    /// Removes the header and strips the key from every row.
    pub fn delete_column(&mut self, name: &str) -> bool {
        let Some(position) = self.active_table().column_index(name) else {
            return false;
        };

        self.mutate(|table| {
            table.headers.remove(position);
            for row in &mut table.rows {
                row.remove(name);
            }
        });
        self.tables[self.active.index()].filters.remove(name);

        let mut selection = self.selection;
        match selection.column {
            Some(col) if col == position => selection.column = None,
            Some(col) if col > position => selection.column = Some(col - 1),
            _ => {}
        }
        self.set_selection(selection);
        true
    }

    /// Appends an empty row carrying the next Feature ID.
    pub fn add_row(&mut self) -> bool {
        let table = self.active_table();
        if table.headers.is_empty() {
            return false;
        }

        let next_id = table
            .column_values(FEATURE_ID_HEADER)
            .filter_map(|v| v.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let mut row: Row = table
            .headers
            .iter()
            .map(|h| (h.clone(), String::new()))
            .collect();
        if table.has_column(FEATURE_ID_HEADER) {
            row.insert(FEATURE_ID_HEADER.to_string(), next_id.to_string());
        }

        self.mutate(|table| table.rows.push(row));
        true
    }

    /// Stable sort on a column.
    ///
    /// Comparison is case-insensitive first with the raw text as tiebreak,
    /// approximating a locale-aware compare.
    pub fn sort(&mut self, column: &str, direction: SortDirection) -> bool {
        if !self.active_table().has_column(column) {
            return false;
        }

        self.mutate(|table| {
            table.rows.sort_by(|a, b| {
                let a = a.get(column).map(String::as_str).unwrap_or("");
                let b = b.get(column).map(String::as_str).unwrap_or("");
                let ordering = compare_text(a, b);
                match direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        });
        debug!(column, ?direction, "Table sorted");
        true
    }

    /// Sets the allowed values of a column and rebuilds rows from the
    /// snapshot. `None` clears the column's filter.
    ///
    /// All active column filters apply together. Edits made after the
    /// snapshot are discarded by the rebuild.
    pub fn filter(&mut self, column: &str, allowed: Option<HashSet<String>>) -> bool {
        let index = self.active.index();
        if !self.tables[index].table.has_column(column) {
            return false;
        }

        let state = &mut self.tables[index];
        state.ensure_snapshot();
        match allowed {
            Some(values) => {
                state.filters.insert(column.to_string(), values);
            }
            None => {
                state.filters.remove(column);
            }
        }

        let headers: HashSet<&str> = state.table.headers.iter().map(String::as_str).collect();
        let rows: Vec<Row> = state
            .baseline()
            .rows
            .iter()
            .filter(|row| {
                state.filters.iter().all(|(col, values)| {
                    values.contains(row.get(col).map(String::as_str).unwrap_or(""))
                })
            })
            .map(|row| {
                row.iter()
                    .filter(|(k, _)| headers.contains(k.as_str()))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .collect();

        debug!(
            column,
            kept = rows.len(),
            filters = state.filters.len(),
            "Filter applied"
        );
        state.table.rows = rows;
        self.mark_modified();
        self.set_selection(Selection::default());
        true
    }

    /// Restores a table from its snapshot and clears its modified flag.
    pub fn reset(&mut self, category: Category) -> bool {
        let state = &mut self.tables[category.index()];
        let Some(original) = state.original.clone() else {
            return false;
        };

        state.table = original;
        state.filters.clear();
        let was_modified = std::mem::replace(&mut state.is_modified, false);
        if was_modified {
            self.events.push(EngineEvent::TableModified {
                category,
                modified: false,
            });
        }
        if category == self.active {
            self.set_selection(Selection::default());
        }
        debug!(category = %category, "Table reset");
        true
    }

    /// Display value of a cell with formulas evaluated.
    pub fn display_cell(&self, row: usize, column: &str) -> Option<String> {
        let table = self.active_table();
        table
            .cell(row, column)
            .map(|value| formula::evaluate_cell(value, table).into_owned())
    }

    /// Footer aggregate for a column; `None` for unknown columns.
    pub fn column_summary(&self, column: &str, aggregate: Aggregate) -> Option<String> {
        let table = self.active_table();
        let column = table.resolve_column(column)?;
        Some(
            Formula {
                aggregate,
                column: column.to_string(),
            }
            .evaluate(table),
        )
    }

    /// Sorted distinct values of a column over the snapshot.
    pub fn distinct_values(&self, column: &str) -> Vec<String> {
        let baseline = self.tables[self.active.index()].baseline();
        if !baseline.has_column(column) {
            return Vec::new();
        }
        baseline
            .column_values(column)
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Indices of rows with a cell containing `query`, case-insensitive.
    pub fn search_rows(&self, query: &str) -> Vec<usize> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        self.active_table()
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.values().any(|v| v.to_lowercase().contains(&query)))
            .map(|(i, _)| i)
            .collect()
    }

    /// Selects a cell of the active table.
    pub fn select_cell(&mut self, row: usize, column: usize) -> bool {
        let table = self.active_table();
        if row >= table.row_count() || column >= table.headers.len() {
            return false;
        }
        self.set_selection(Selection {
            row: Some(row),
            column: Some(column),
        });
        true
    }

    /// Selects a whole row of the active table.
    pub fn select_row(&mut self, row: usize) -> bool {
        if row >= self.active_table().row_count() {
            return false;
        }
        self.set_selection(Selection {
            row: Some(row),
            column: None,
        });
        true
    }

    /// Clears the selection unless the click hit a header cell or a context
    /// menu is open.
    pub fn clear_selection(&mut self, click: OutsideClick) -> bool {
        if click.on_header || click.context_menu_open || self.selection.is_empty() {
            return false;
        }
        self.set_selection(Selection::default());
        true
    }

    /// Export data of a table with formulas evaluated.
    pub fn export(&self, category: Category) -> ExportData {
        ExportData::from_table(category.title(), self.table(category))
    }

    fn mutate(&mut self, f: impl FnOnce(&mut Table)) {
        let state = &mut self.tables[self.active.index()];
        state.ensure_snapshot();
        f(&mut state.table);
        self.mark_modified();
    }

    fn mark_modified(&mut self) {
        let category = self.active;
        let state = &mut self.tables[category.index()];
        if !state.is_modified {
            state.is_modified = true;
            self.events.push(EngineEvent::TableModified {
                category,
                modified: true,
            });
        }
    }

    fn set_selection(&mut self, selection: Selection) {
        if self.selection != selection {
            self.selection = selection;
            self.events.push(EngineEvent::SelectionChanged {
                category: self.active,
                selection,
            });
        }
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
