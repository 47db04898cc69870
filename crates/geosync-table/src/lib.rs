//! # GeoSync Table
//!
//! Tabular view of feature collections and the editable table engine on top
//! of it.
//!
//! - **Projector**: one row per feature, synthetic `Feature ID` and
//!   `Geometry Type` columns, every cell a display string.
//! - **Formulas**: `=SUM(column)` and `=AVERAGE(column)` evaluated at display
//!   time, never persisted.
//! - **Engine**: per-category tables with edit, delete, sort, filter,
//!   snapshot, and reset.
//! - **Export**: header-ordered rows for external encoders.
//!
//! # Example
//!
//! ```rust
//! use geosync_core::types::Category;
//! use geosync_table::{project_value, TableEngine};
//! use std::collections::HashSet;
//!
//! let doc = serde_json::json!({
//!     "features": [
//!         {"geometry": {"type": "Point", "coordinates": [-74.0, 40.7]}, "properties": {"name": "Joe", "visits": 10}},
//!         {"geometry": {"type": "Point", "coordinates": [-74.1, 40.8]}, "properties": {"name": "Abraço", "visits": 5}}
//!     ]
//! });
//!
//! let mut engine = TableEngine::new();
//! engine.set_table(Category::PointsOfInterest, project_value(&doc));
//!
//! engine.edit_cell(0, "visits", "=SUM(visits)");
//! assert_eq!(engine.display_cell(0, "visits").as_deref(), Some("5.00"));
//!
//! engine.filter("name", Some(HashSet::from(["Joe".to_string()])));
//! assert_eq!(engine.active_table().row_count(), 1);
//!
//! engine.reset(Category::PointsOfInterest);
//! assert_eq!(engine.active_table().cell(0, "visits"), Some("10"));
//! ```

pub mod engine;
pub mod export;
pub mod formula;
pub mod projector;
pub mod table;

// Re-export commonly used types
pub use engine::{EngineEvent, OutsideClick, Selection, SortDirection, TableEngine, TableState};
pub use export::ExportData;
pub use formula::{evaluate_cell, Aggregate, Formula};
pub use projector::{project, project_value};
pub use table::{Row, Table, FEATURE_ID_HEADER, GEOMETRY_TYPE_HEADER};
