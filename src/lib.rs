//! # GeoSync
//!
//! Keeps a map and a spreadsheet-like table in sync.
//!
//! Feature collections are loaded per layer, projected into one table per
//! category, and kept linked both ways: a map click selects the nearest
//! feature's row, and a row selection centers the map on the row's feature
//! and highlights it.
//!
//! The pieces live in their own crates and are re-exported here:
//!
//! - [`core`]: types, geodesy, errors, configuration
//! - [`table`]: projection and the editable table engine
//! - [`spatial`]: nearest-feature search and row correlation
//! - [`map`]: map adapter, centering, highlight, layers, loading
//!
//! [`MapSession`] wires them together for a UI shell.

pub mod logging;
pub mod session;
pub mod ui_state;

pub use geosync_core as core;
pub use geosync_map as map;
pub use geosync_spatial as spatial;
pub use geosync_table as table;

pub use logging::init_tracing;
pub use session::{MapClick, MapSession, SessionEvent, DEFAULT_VISIBLE};
pub use ui_state::{ContextMenu, UiAction, UiState};
