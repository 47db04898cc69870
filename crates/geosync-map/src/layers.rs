//! Layer visibility controller.
//!
//! Every [`LayerKey`] has one slot. A layer is built at most once per
//! registry (fetch plus marker/heat/circle construction) and then attached
//! and detached from the map any number of times without rebuilding.
//!
//! Visibility requested before the build finishes is recorded and applied
//! when the build completes, so a layer is never attached before it exists.
//! Heat layers wait on the [`PluginGate`] before they are constructed.

use crate::adapter::{HeatPoint, LayerGraphic, LayerStyle, MarkerSpec, SharedMap};
use crate::loader::FeatureLoader;
use futures::future::join_all;
use geosync_core::error::LayerError;
use geosync_core::types::{value_as_f64, Feature, FeatureCollection, LayerKey, LayerKind, MarkerId};
use geosync_core::{GeoSyncError, Result};
use geosync_spatial::{CategoryStrategy, MarkerInfo};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, OnceCell};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const HEAT_WEIGHT_FIELDS: [&str; 5] = ["intensity", "count", "visits", "traffic", "value"];

/// Build progress of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerState {
    Unbuilt,
    Building,
    Built,
    Failed,
}

/// Colors per layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    styles: HashMap<LayerKey, LayerStyle>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            styles: HashMap::from([
                (LayerKey::CoffeeShops, LayerStyle::solid("#6f4e37")),
                (LayerKey::FootTraffic, LayerStyle::heat("#dc2626")),
                (LayerKey::Radius, LayerStyle::solid("#3388ff")),
                (LayerKey::SubwayStations, LayerStyle::solid("#0039a6")),
                (LayerKey::Storefronts, LayerStyle::solid("#16a34a")),
            ]),
        }
    }
}

impl Palette {
    pub fn style(&self, key: LayerKey) -> LayerStyle {
        self.styles
            .get(&key)
            .cloned()
            .unwrap_or_else(|| LayerStyle::solid("#3388ff"))
    }

    /// Replaces the style of one layer.
    pub fn with_style(mut self, key: LayerKey, style: LayerStyle) -> Self {
        self.styles.insert(key, style);
        self
    }
}

/// Load state of the heat-layer renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginState {
    Pending,
    Ready,
    Failed,
}

/// Readiness of the heat-layer renderer.
///
/// Heat layers are not constructed until the gate opens. A failed gate, or
/// one still pending after the registry's plugin wait, fails the heat layer
/// instead of blocking it.
#[derive(Debug)]
pub struct PluginGate {
    state: watch::Sender<PluginState>,
}

impl Default for PluginGate {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginGate {
    /// A pending gate.
    pub fn new() -> Self {
        let (state, _) = watch::channel(PluginState::Pending);
        Self { state }
    }

    /// An already open gate.
    pub fn opened() -> Self {
        let gate = Self::new();
        gate.open();
        gate
    }

    pub fn open(&self) {
        self.state.send_replace(PluginState::Ready);
    }

    /// Marks the renderer as unavailable, releasing every waiting heat build.
    pub fn fail(&self) {
        self.state.send_replace(PluginState::Failed);
    }

    pub fn state(&self) -> PluginState {
        *self.state.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.state() == PluginState::Ready
    }

    /// Waits until the gate leaves `Pending` and returns the settled state.
    pub async fn wait(&self) -> PluginState {
        let mut rx = self.state.subscribe();
        let settled = match rx.wait_for(|state| *state != PluginState::Pending).await {
            Ok(state) => *state,
            // The sender lives in self, so the channel cannot close while waiting
            Err(_) => PluginState::Failed,
        };
        settled
    }
}

/// Data of a built layer.
#[derive(Debug)]
pub struct BuiltLayer {
    pub key: LayerKey,
    /// Radius-filtered features the layer was built from
    pub collection: FeatureCollection,
    /// Marker descriptions for row correlation; ids are feature indices
    pub markers: Vec<MarkerInfo>,
}

#[derive(Debug)]
struct SlotStatus {
    state: LayerState,
    graphic: Option<LayerGraphic>,
    attached: Option<MarkerId>,
    desired_visible: bool,
}

#[derive(Debug)]
struct LayerSlot {
    cell: OnceCell<Arc<BuiltLayer>>,
    status: Mutex<SlotStatus>,
}

impl LayerSlot {
    fn new() -> Self {
        Self {
            cell: OnceCell::new(),
            status: Mutex::new(SlotStatus {
                state: LayerState::Unbuilt,
                graphic: None,
                attached: None,
                desired_visible: false,
            }),
        }
    }
}

/// Default limit on how long a heat layer waits for its renderer.
pub const DEFAULT_PLUGIN_WAIT: Duration = Duration::from_secs(10);

/// Registry of every map layer.
pub struct LayerRegistry {
    map: SharedMap,
    loader: Arc<FeatureLoader>,
    gate: PluginGate,
    plugin_wait: Duration,
    palette: Mutex<Palette>,
    slots: HashMap<LayerKey, LayerSlot>,
}

impl LayerRegistry {
    pub fn new(map: SharedMap, loader: Arc<FeatureLoader>, gate: PluginGate) -> Self {
        Self {
            map,
            loader,
            gate,
            plugin_wait: DEFAULT_PLUGIN_WAIT,
            palette: Mutex::new(Palette::default()),
            slots: LayerKey::ALL
                .into_iter()
                .map(|key| (key, LayerSlot::new()))
                .collect(),
        }
    }

    /// Sets how long heat layers wait for a pending plugin gate.
    pub fn with_plugin_wait(mut self, wait: Duration) -> Self {
        self.plugin_wait = wait;
        self
    }

    pub fn plugin_gate(&self) -> &PluginGate {
        &self.gate
    }

    pub fn is_torn_down(&self) -> bool {
        self.loader.cancellation_token().is_cancelled()
    }

    pub fn state(&self, key: LayerKey) -> LayerState {
        self.slots
            .get(&key)
            .map(|slot| slot.status.lock().state)
            .unwrap_or(LayerState::Unbuilt)
    }

    /// True while the layer group is on the map.
    pub fn is_attached(&self, key: LayerKey) -> bool {
        self.slots
            .get(&key)
            .is_some_and(|slot| slot.status.lock().attached.is_some())
    }

    pub fn is_desired_visible(&self, key: LayerKey) -> bool {
        self.slots
            .get(&key)
            .is_some_and(|slot| slot.status.lock().desired_visible)
    }

    /// The built layer, if its build has completed.
    pub fn layer(&self, key: LayerKey) -> Option<Arc<BuiltLayer>> {
        self.slots.get(&key)?.cell.get().cloned()
    }

    /// Current graphic of a built layer, including its style.
    pub fn graphic(&self, key: LayerKey) -> Option<LayerGraphic> {
        self.slots.get(&key)?.status.lock().graphic.clone()
    }

    fn slot(&self, key: LayerKey) -> Result<&LayerSlot> {
        self.slots
            .get(&key)
            .ok_or_else(|| GeoSyncError::from(LayerError::build_failed(key, "no slot for layer")))
    }

    /// Builds a layer once. Concurrent and repeated calls share the first
    /// build. A failed build leaves the slot empty, so a later call retries.
    pub async fn build(&self, key: LayerKey) -> Result<Arc<BuiltLayer>> {
        if self.is_torn_down() {
            return Err(LayerError::TornDown.into());
        }
        let slot = self.slot(key)?;

        let result = slot
            .cell
            .get_or_try_init(|| self.construct(key, slot))
            .await
            .cloned();

        let mut status = slot.status.lock();
        match result {
            Ok(layer) => {
                if status.state != LayerState::Built {
                    status.state = LayerState::Built;
                    info!(layer = %key, features = layer.collection.len(), "Layer built");
                }
                if !self.is_torn_down() {
                    self.apply_visibility(key, &mut status);
                }
                Ok(layer)
            }
            Err(e) => {
                status.state = LayerState::Failed;
                warn!(layer = %key, error = %e, "Layer build failed");
                Err(e)
            }
        }
    }

    /// Builds every layer concurrently.
    pub async fn build_all(&self) -> Vec<(LayerKey, Result<Arc<BuiltLayer>>)> {
        let results = join_all(LayerKey::ALL.into_iter().map(|key| self.build(key))).await;
        LayerKey::ALL.into_iter().zip(results).collect()
    }

    async fn construct(&self, key: LayerKey, slot: &LayerSlot) -> Result<Arc<BuiltLayer>> {
        slot.status.lock().state = LayerState::Building;
        let cancel = self.loader.cancellation_token();

        if key.kind() == LayerKind::Heat {
            self.await_plugin(key, &cancel).await?;
        }

        let collection = if key.needs_data() {
            if !self.loader.has_source(key) {
                return Err(LayerError::NoSource {
                    key: key.to_string(),
                }
                .into());
            }
            self.loader.load(key).await
        } else {
            FeatureCollection::default()
        };

        if cancel.is_cancelled() {
            return Err(LayerError::TornDown.into());
        }

        let style = self.palette.lock().style(key);
        let (graphic, markers) = match key.kind() {
            LayerKind::Markers => marker_graphic(key, &collection, style),
            LayerKind::Heat => (heat_graphic(&collection, style), Vec::new()),
            LayerKind::Circle => (
                LayerGraphic::Circle {
                    center: self.loader.center(),
                    radius_m: self.loader.radius_m(),
                    style,
                },
                Vec::new(),
            ),
        };
        slot.status.lock().graphic = Some(graphic);

        Ok(Arc::new(BuiltLayer {
            key,
            collection,
            markers,
        }))
    }

    async fn await_plugin(&self, key: LayerKey, cancel: &CancellationToken) -> Result<()> {
        let state = match self.gate.state() {
            PluginState::Pending => {
                debug!(layer = %key, wait_ms = self.plugin_wait.as_millis() as u64, "Waiting for heat plugin");
                tokio::select! {
                    _ = cancel.cancelled() => return Err(LayerError::TornDown.into()),
                    state = timeout(self.plugin_wait, self.gate.wait()) => {
                        state.unwrap_or(PluginState::Pending)
                    }
                }
            }
            settled => settled,
        };

        match state {
            PluginState::Ready => Ok(()),
            state => {
                warn!(layer = %key, ?state, "Heat plugin unavailable");
                Err(LayerError::PluginUnavailable {
                    key: key.to_string(),
                }
                .into())
            }
        }
    }

    /// Shows or hides a layer.
    ///
    /// Before the build completes the request is only recorded. Returns true
    /// when the map was updated now.
    pub fn set_visible(&self, key: LayerKey, visible: bool) -> bool {
        if self.is_torn_down() {
            return false;
        }
        let Some(slot) = self.slots.get(&key) else {
            return false;
        };

        let mut status = slot.status.lock();
        status.desired_visible = visible;
        if slot.cell.initialized() {
            self.apply_visibility(key, &mut status)
        } else {
            debug!(layer = %key, visible, "Layer not built yet, visibility buffered");
            false
        }
    }

    fn apply_visibility(&self, key: LayerKey, status: &mut SlotStatus) -> bool {
        match (status.desired_visible, status.attached) {
            (true, None) => {
                let Some(graphic) = status.graphic.clone() else {
                    return false;
                };
                let id = self.map.lock().add_layer(graphic);
                status.attached = Some(id);
                debug!(layer = %key, %id, "Layer attached");
                true
            }
            (false, Some(id)) => {
                self.map.lock().remove_layer(id);
                status.attached = None;
                debug!(layer = %key, %id, "Layer detached");
                true
            }
            _ => false,
        }
    }

    /// Applies a palette to every built layer in place. Returns the number of
    /// layers restyled.
    pub fn recolor(&self, palette: Palette) -> usize {
        let mut restyled = 0;
        for (key, slot) in &self.slots {
            let mut status = slot.status.lock();
            let style = palette.style(*key);
            let Some(graphic) = status.graphic.as_mut() else {
                continue;
            };
            graphic.set_style(style.clone());
            if let Some(id) = status.attached {
                self.map.lock().restyle_layer(id, &style);
            }
            restyled += 1;
        }
        *self.palette.lock() = palette;
        debug!(restyled, "Palette applied");
        restyled
    }

    /// Cancels pending builds and detaches every layer.
    pub fn teardown(&self) {
        self.loader.cancel();
        let mut detached = 0;
        for slot in self.slots.values() {
            let mut status = slot.status.lock();
            status.desired_visible = false;
            if let Some(id) = status.attached.take() {
                self.map.lock().remove_layer(id);
                detached += 1;
            }
        }
        info!(detached, "Layer registry torn down");
    }
}

fn marker_graphic(
    key: LayerKey,
    collection: &FeatureCollection,
    style: LayerStyle,
) -> (LayerGraphic, Vec<MarkerInfo>) {
    let strategy = key.category().map(CategoryStrategy::for_category);
    let mut specs = Vec::with_capacity(collection.len());
    let mut markers = Vec::with_capacity(collection.len());

    for (index, feature) in collection.iter().enumerate() {
        let Some(position) = feature.location() else {
            continue;
        };
        let description = strategy
            .as_ref()
            .map(|s| s.describe(feature))
            .unwrap_or_default();
        markers.push(MarkerInfo::new(
            MarkerId(index as u64),
            description.clone(),
            position,
        ));
        specs.push(MarkerSpec {
            position,
            description,
        });
    }

    (
        LayerGraphic::Markers {
            markers: specs,
            style,
        },
        markers,
    )
}

fn heat_weight(feature: &Feature) -> Option<f64> {
    HEAT_WEIGHT_FIELDS
        .iter()
        .find_map(|f| feature.properties.get(*f).and_then(value_as_f64))
        .filter(|w| *w >= 0.0)
}

fn heat_graphic(collection: &FeatureCollection, style: LayerStyle) -> LayerGraphic {
    let max = collection
        .iter()
        .filter_map(heat_weight)
        .fold(0.0_f64, f64::max);

    let points = collection
        .iter()
        .filter_map(|feature| {
            let position = feature.location()?;
            let intensity = match heat_weight(feature) {
                Some(weight) if max > 0.0 => weight / max,
                _ => 1.0,
            };
            Some(HeatPoint {
                position,
                intensity,
            })
        })
        .collect();

    LayerGraphic::Heat { points, style }
}
