//! One map session: layers, tables, and the two entry events.
//!
//! A map click resolves the nearest feature of the active category and
//! selects its row. A row selection resolves the row back to a position,
//! centers the map clear of the table panel, and shows a transient
//! highlight. Clicks are ignored while the active category's layer is
//! hidden.

use crate::ui_state::{UiAction, UiState};
use async_channel::{Receiver, Sender};
use geosync_core::config::AppConfig;
use geosync_core::types::{Category, FeatureCollection, LatLng, LayerKey};
use geosync_map::geocode::{DebouncedSearch, GeocodeResult, Geocoder};
use geosync_map::layers::{LayerRegistry, Palette, PluginGate};
use geosync_map::loader::FeatureLoader;
use geosync_map::notify::{Notification, NotificationLevel, Notifier};
use geosync_map::{Highlight, HighlightController, PanelGeometry, SharedMap};
use geosync_spatial::{find_nearest, CorrelationContext, Correlator, MarkerInfo, StrategyTable};
use geosync_table::{project, EngineEvent, OutsideClick, Selection, TableEngine, FEATURE_ID_HEADER};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Layers shown once the session loads.
pub const DEFAULT_VISIBLE: [LayerKey; 2] = [LayerKey::CoffeeShops, LayerKey::Radius];

/// Notifications for the surrounding chrome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    LayersReady {
        ready: Vec<LayerKey>,
        failed: Vec<LayerKey>,
    },
    TableModified {
        category: Category,
        modified: bool,
    },
    SelectionChanged {
        category: Category,
        selection: Selection,
    },
    Highlighted {
        category: Category,
        row: usize,
        highlight: Highlight,
    },
    Notification(Notification),
}

impl From<EngineEvent> for SessionEvent {
    fn from(event: EngineEvent) -> Self {
        match event {
            EngineEvent::TableModified { category, modified } => {
                SessionEvent::TableModified { category, modified }
            }
            EngineEvent::SelectionChanged {
                category,
                selection,
            } => SessionEvent::SelectionChanged {
                category,
                selection,
            },
        }
    }
}

/// Result of a map click that hit a feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapClick {
    pub category: Category,
    /// Index of the feature in the layer's collection
    pub feature_index: usize,
    /// Table row showing the feature; `None` when it was filtered or deleted
    pub row: Option<usize>,
    pub distance_m: f64,
}

pub struct MapSession {
    config: AppConfig,
    layers: LayerRegistry,
    engine: Mutex<TableEngine>,
    correlator: Correlator,
    highlight: HighlightController,
    notifier: Notifier,
    search: Option<DebouncedSearch>,
    ui: Mutex<UiState>,
    panel: Mutex<PanelGeometry>,
    events: Sender<SessionEvent>,
}

impl MapSession {
    /// Creates a session and the receiver of its events.
    ///
    /// Highlight and notification timers run on the tokio runtime current
    /// at creation, so the synchronous handlers can be called from a UI
    /// thread outside it.
    pub fn new(
        config: AppConfig,
        map: SharedMap,
        loader: FeatureLoader,
        gate: PluginGate,
    ) -> (Self, Receiver<SessionEvent>) {
        let (events, receiver) = async_channel::unbounded();
        let session = Self {
            layers: LayerRegistry::new(Arc::clone(&map), Arc::new(loader), gate)
                .with_plugin_wait(config.timers.plugin_wait()),
            engine: Mutex::new(TableEngine::new()),
            correlator: Correlator::new(StrategyTable::from_config(&config.centering)),
            highlight: HighlightController::new(
                map,
                config.timers.highlight(),
                config.timers.pan_animation(),
            ),
            notifier: Notifier::new(config.timers.notification()),
            search: None,
            ui: Mutex::new(UiState::default()),
            panel: Mutex::new(PanelGeometry::default()),
            events,
            config,
        };
        (session, receiver)
    }

    /// Enables location search.
    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.search = Some(DebouncedSearch::new(
            geocoder,
            self.config.timers.search_debounce(),
        ));
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn layers(&self) -> &LayerRegistry {
        &self.layers
    }

    pub fn ui(&self) -> UiState {
        self.ui.lock().clone()
    }

    /// Builds every layer, projects the loaded collections into tables, and
    /// emits [`SessionEvent::LayersReady`].
    ///
    /// Heat layers wait for the plugin gate for at most the configured plugin
    /// wait; a failed or late plugin reports the heat layer in `failed`.
    pub async fn load(&self) {
        for key in DEFAULT_VISIBLE {
            self.layers.set_visible(key, true);
        }

        let results = self.layers.build_all().await;
        let mut ready = Vec::new();
        let mut failed = Vec::new();
        self.with_engine(|engine| {
            for (key, result) in &results {
                match result {
                    Ok(layer) => {
                        if let Some(category) = key.category() {
                            engine.set_table(category, project(&layer.collection));
                        }
                        ready.push(*key);
                    }
                    Err(_) => failed.push(*key),
                }
            }
        });

        for key in &failed {
            self.notify(
                NotificationLevel::Warning,
                format!("Layer {} could not be loaded", key),
            );
        }
        info!(ready = ready.len(), failed = failed.len(), "Layers ready");
        self.emit(SessionEvent::LayersReady { ready, failed });
    }

    /// Runs `f` against the table engine and publishes the events it
    /// produced.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut TableEngine) -> R) -> R {
        let (result, events) = {
            let mut engine = self.engine.lock();
            let result = f(&mut engine);
            (result, engine.drain_events())
        };
        for event in events {
            self.emit(event.into());
        }
        result
    }

    /// Shows or hides a layer; see [`LayerRegistry::set_visible`].
    pub fn set_layer_visible(&self, key: LayerKey, visible: bool) -> bool {
        self.layers.set_visible(key, visible)
    }

    pub fn recolor(&self, palette: Palette) -> usize {
        self.layers.recolor(palette)
    }

    /// Records the panel sizes reported by the hosting UI, in pixels.
    pub fn set_panel_size(&self, container_height: f64, table_height: f64) {
        let mut panel = self.panel.lock();
        panel.container_height = container_height;
        panel.table_height = table_height;
    }

    /// Current panel geometry, with visibility flags from the UI state.
    pub fn panel_geometry(&self) -> PanelGeometry {
        let ui = self.ui.lock();
        PanelGeometry {
            show_table: ui.show_table,
            fullscreen: ui.fullscreen,
            ..*self.panel.lock()
        }
    }

    pub fn dispatch(&self, action: UiAction) -> UiState {
        let mut ui = self.ui.lock();
        *ui = std::mem::take(&mut *ui).apply(action);
        ui.clone()
    }

    /// Handles a click on the map.
    pub fn on_map_click(&self, point: LatLng) -> Option<MapClick> {
        let category = self.engine.lock().active();
        let key = category.layer_key();
        if !self.layers.is_attached(key) {
            debug!(layer = %key, "Layer hidden, click ignored");
            return None;
        }

        let layer = self.layers.layer(key)?;
        let hit = find_nearest(point, &layer.collection, self.config.map.click_tolerance_m)?;
        let feature_id = (hit.index + 1).to_string();

        let row = self.with_engine(|engine| {
            let row = engine
                .active_table()
                .rows
                .iter()
                .position(|r| r.get(FEATURE_ID_HEADER) == Some(&feature_id))?;
            engine.select_row(row);
            Some(row)
        });

        debug!(category = %category, index = hit.index, ?row, distance_m = hit.distance_m, "Map click resolved");
        Some(MapClick {
            category,
            feature_index: hit.index,
            row,
            distance_m: hit.distance_m,
        })
    }

    /// Handles a row selection in the active table.
    ///
    /// Returns `None` when the row cannot be located on the map.
    pub fn on_row_select(&self, row: usize) -> Option<Highlight> {
        let selected = self.with_engine(|engine| {
            if !engine.select_row(row) {
                return None;
            }
            let category = engine.active();
            Some((category, engine.active_table().rows[row].clone()))
        });
        let (category, data) = selected?;

        self.highlight.begin();
        let layer = self.layers.layer(category.layer_key());
        let empty = FeatureCollection::default();
        let ctx = CorrelationContext {
            markers: layer.as_ref().map_or(&[] as &[MarkerInfo], |l| l.markers.as_slice()),
            features: layer.as_ref().map_or(&empty, |l| &l.collection),
        };

        let Some(resolution) = self.correlator.resolve(&data, category, &ctx) else {
            self.highlight.not_found();
            debug!(category = %category, row, "Row has no map position");
            return None;
        };

        let profile = self.correlator.strategies().get(category).centering;
        let highlight = self
            .highlight
            .found(resolution.position(), &profile, &self.panel_geometry());
        self.emit(SessionEvent::Highlighted {
            category,
            row,
            highlight,
        });
        Some(highlight)
    }

    /// Handles a click outside the table.
    pub fn on_outside_click(&self, on_header: bool) -> bool {
        let context_menu_open = self.ui.lock().is_context_menu_open();
        self.with_engine(|engine| {
            engine.clear_selection(OutsideClick {
                on_header,
                context_menu_open,
            })
        })
    }

    /// Debounced location search; `None` when superseded by a newer query.
    pub async fn search(&self, query: &str) -> Option<Vec<GeocodeResult>> {
        self.dispatch(UiAction::SetSearchQuery {
            query: query.to_string(),
        });
        match &self.search {
            Some(search) => search.search(query).await,
            None => Some(Vec::new()),
        }
    }

    /// Centers on a search result with the active category's profile.
    pub fn focus(&self, result: &GeocodeResult) -> Highlight {
        let category = self.engine.lock().active();
        let profile = self.correlator.strategies().get(category).centering;
        self.highlight.begin();
        self.highlight
            .found(result.position, &profile, &self.panel_geometry())
    }

    /// Restores a table and tells the user.
    pub fn reset_table(&self, category: Category) -> bool {
        let reset = self.with_engine(|engine| engine.reset(category));
        if reset {
            self.notify(
                NotificationLevel::Info,
                format!("{} restored to its original data", category.title()),
            );
        }
        reset
    }

    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        let notification = self.notifier.notify(level, message);
        self.emit(SessionEvent::Notification(notification));
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifier.active()
    }

    /// Cancels loads and timers, detaches layers, and closes the event
    /// channel.
    pub fn shutdown(&self) {
        self.layers.teardown();
        self.highlight.clear();
        self.notifier.clear();
        if let Some(search) = &self.search {
            search.cancel();
        }
        self.events.close();
        info!("Map session shut down");
    }

    fn emit(&self, event: SessionEvent) {
        // Events are dropped once the receiver is gone or the session shut down
        let _ = self.events.try_send(event);
    }
}

impl Drop for MapSession {
    fn drop(&mut self) {
        self.layers.teardown();
    }
}
