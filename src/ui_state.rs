//! UI flags as one value with a reducer.
//!
//! The hosting shell renders from [`UiState`] and reports user gestures as
//! [`UiAction`]s. Nothing here touches the map or the tables.

use geosync_core::types::LayerKey;
use serde::{Deserialize, Serialize};

/// Open context menu anchored on a table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMenu {
    pub row: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiState {
    /// Table panel open below the map
    pub show_table: bool,
    pub fullscreen: bool,
    pub context_menu: Option<ContextMenu>,
    /// Column whose filter menu is open
    pub filter_menu: Option<String>,
    pub search_query: String,
    pub palette_editor_open: bool,
    /// Layer whose legend entry is expanded
    pub legend_focus: Option<LayerKey>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            show_table: true,
            fullscreen: false,
            context_menu: None,
            filter_menu: None,
            search_query: String::new(),
            palette_editor_open: false,
            legend_focus: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum UiAction {
    ToggleTable,
    SetFullscreen { enabled: bool },
    OpenContextMenu { row: usize, column: usize },
    CloseContextMenu,
    OpenFilterMenu { column: String },
    CloseFilterMenu,
    SetSearchQuery { query: String },
    TogglePaletteEditor,
    FocusLegend { layer: Option<LayerKey> },
    /// Closes every open menu and editor
    Escape,
}

impl UiState {
    /// Returns the state after `action`.
    pub fn apply(mut self, action: UiAction) -> Self {
        match action {
            UiAction::ToggleTable => {
                self.show_table = !self.show_table;
                if !self.show_table {
                    self.context_menu = None;
                    self.filter_menu = None;
                }
            }
            UiAction::SetFullscreen { enabled } => self.fullscreen = enabled,
            UiAction::OpenContextMenu { row, column } => {
                self.filter_menu = None;
                self.context_menu = Some(ContextMenu { row, column });
            }
            UiAction::CloseContextMenu => self.context_menu = None,
            UiAction::OpenFilterMenu { column } => {
                self.context_menu = None;
                self.filter_menu = Some(column);
            }
            UiAction::CloseFilterMenu => self.filter_menu = None,
            UiAction::SetSearchQuery { query } => self.search_query = query,
            UiAction::TogglePaletteEditor => self.palette_editor_open = !self.palette_editor_open,
            UiAction::FocusLegend { layer } => self.legend_focus = layer,
            UiAction::Escape => {
                self.context_menu = None;
                self.filter_menu = None;
                self.palette_editor_open = false;
            }
        }
        self
    }

    pub fn is_context_menu_open(&self) -> bool {
        self.context_menu.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menus_are_exclusive() {
        let state = UiState::default()
            .apply(UiAction::OpenContextMenu { row: 1, column: 2 })
            .apply(UiAction::OpenFilterMenu {
                column: "name".to_string(),
            });
        assert_eq!(state.context_menu, None);
        assert_eq!(state.filter_menu.as_deref(), Some("name"));

        let state = state.apply(UiAction::OpenContextMenu { row: 0, column: 0 });
        assert_eq!(state.filter_menu, None);
        assert!(state.is_context_menu_open());
    }

    #[test]
    fn test_hiding_table_closes_table_menus() {
        let state = UiState::default()
            .apply(UiAction::OpenContextMenu { row: 0, column: 0 })
            .apply(UiAction::ToggleTable);
        assert!(!state.show_table);
        assert!(!state.is_context_menu_open());

        assert!(state.apply(UiAction::ToggleTable).show_table);
    }

    #[test]
    fn test_escape() {
        let state = UiState::default()
            .apply(UiAction::TogglePaletteEditor)
            .apply(UiAction::SetSearchQuery {
                query: "union sq".to_string(),
            })
            .apply(UiAction::OpenFilterMenu {
                column: "rating".to_string(),
            })
            .apply(UiAction::Escape);

        assert!(!state.palette_editor_open);
        assert_eq!(state.filter_menu, None);
        assert_eq!(state.search_query, "union sq");
    }
}
