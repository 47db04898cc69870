//! Map adapter seam.
//!
//! Synchronization logic talks to the map only through [`MapAdapter`], so it
//! runs against [`HeadlessMap`] in tests and against a rendering map library
//! in a UI shell.

use geosync_core::types::{LatLng, MarkerId, ScreenPoint};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;

/// Size of one Web-Mercator tile in pixels at zoom 0.
pub const TILE_SIZE: f64 = 256.0;

const MAX_LATITUDE: f64 = 85.051_128_779_8;

/// Map shared between the session and timer tasks.
pub type SharedMap = Arc<Mutex<dyn MapAdapter>>;

/// Style of a single marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerStyle {
    pub color: String,
    pub label: Option<String>,
}

/// One stop of a heat gradient, `offset` in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub offset: f64,
    pub color: String,
}

/// Colors of a layer: marker and circle color, heat gradient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerStyle {
    pub color: String,
    #[serde(default)]
    pub gradient: Vec<GradientStop>,
}

impl LayerStyle {
    pub fn solid(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            gradient: Vec::new(),
        }
    }

    /// Blue-to-`color` gradient used by heat layers.
    pub fn heat(color: impl Into<String>) -> Self {
        let color = color.into();
        Self {
            gradient: vec![
                GradientStop {
                    offset: 0.4,
                    color: "#3b82f6".to_string(),
                },
                GradientStop {
                    offset: 0.65,
                    color: "#facc15".to_string(),
                },
                GradientStop {
                    offset: 1.0,
                    color: color.clone(),
                },
            ],
            color,
        }
    }
}

/// A point marker inside a marker layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSpec {
    pub position: LatLng,
    pub description: String,
}

/// A weighted heat point, `intensity` in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatPoint {
    pub position: LatLng,
    pub intensity: f64,
}

/// Renderable content of a layer group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerGraphic {
    Markers {
        markers: Vec<MarkerSpec>,
        style: LayerStyle,
    },
    Heat {
        points: Vec<HeatPoint>,
        style: LayerStyle,
    },
    Circle {
        center: LatLng,
        radius_m: f64,
        style: LayerStyle,
    },
}

impl LayerGraphic {
    pub fn style(&self) -> &LayerStyle {
        match self {
            LayerGraphic::Markers { style, .. }
            | LayerGraphic::Heat { style, .. }
            | LayerGraphic::Circle { style, .. } => style,
        }
    }

    pub fn set_style(&mut self, new_style: LayerStyle) {
        match self {
            LayerGraphic::Markers { style, .. }
            | LayerGraphic::Heat { style, .. }
            | LayerGraphic::Circle { style, .. } => *style = new_style,
        }
    }
}

/// Operations the synchronization engine needs from a map.
pub trait MapAdapter: Send {
    /// Adds a standalone marker.
    fn add_marker(&mut self, position: LatLng, style: MarkerStyle) -> MarkerId;

    /// Attaches a layer group.
    fn add_layer(&mut self, graphic: LayerGraphic) -> MarkerId;

    /// Removes a marker or layer group. Returns false if it was not on the map.
    fn remove_layer(&mut self, id: MarkerId) -> bool;

    /// Updates the style of an attached layer group in place.
    fn restyle_layer(&mut self, id: MarkerId, style: &LayerStyle) -> bool;

    /// Projects a coordinate to absolute pixel space at `zoom`.
    fn project(&self, position: LatLng, zoom: f64) -> ScreenPoint;

    /// Inverse of [`project`](Self::project).
    fn unproject(&self, point: ScreenPoint, zoom: f64) -> LatLng;

    /// Animated pan and zoom.
    fn fly_to(&mut self, center: LatLng, zoom: f64, duration: Duration);

    fn center(&self) -> LatLng;

    fn zoom(&self) -> f64;
}

/// Spherical Mercator projection to absolute pixels.
pub fn mercator_project(position: LatLng, zoom: f64) -> ScreenPoint {
    let scale = TILE_SIZE * 2_f64.powf(zoom);
    let lat = position.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let sin_lat = lat.to_radians().sin();

    let x = scale * (position.lng + 180.0) / 360.0;
    let y = scale * (0.5 - ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / (4.0 * PI));
    ScreenPoint::new(x, y)
}

/// Inverse of [`mercator_project`].
pub fn mercator_unproject(point: ScreenPoint, zoom: f64) -> LatLng {
    let scale = TILE_SIZE * 2_f64.powf(zoom);
    let lng = point.x / scale * 360.0 - 180.0;
    let n = PI - 2.0 * PI * point.y / scale;
    let lat = n.sinh().atan().to_degrees();
    LatLng::new(lat, lng)
}

/// A recorded `fly_to` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlyTo {
    pub center: LatLng,
    pub zoom: f64,
    pub duration: Duration,
}

/// In-memory map used by tests and non-rendering hosts.
///
/// Animations complete immediately; every `fly_to` is recorded.
#[derive(Debug)]
pub struct HeadlessMap {
    center: LatLng,
    zoom: f64,
    next_id: u64,
    markers: BTreeMap<MarkerId, (LatLng, MarkerStyle)>,
    layers: BTreeMap<MarkerId, LayerGraphic>,
    flights: Vec<FlyTo>,
}

impl HeadlessMap {
    pub fn new(center: LatLng, zoom: f64) -> Self {
        Self {
            center,
            zoom,
            next_id: 1,
            markers: BTreeMap::new(),
            layers: BTreeMap::new(),
            flights: Vec::new(),
        }
    }

    /// Wraps the map for sharing; the typed handle stays inspectable.
    pub fn shared(self) -> Arc<Mutex<HeadlessMap>> {
        Arc::new(Mutex::new(self))
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn marker(&self, id: MarkerId) -> Option<&(LatLng, MarkerStyle)> {
        self.markers.get(&id)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, id: MarkerId) -> Option<&LayerGraphic> {
        self.layers.get(&id)
    }

    pub fn flights(&self) -> &[FlyTo] {
        &self.flights
    }

    pub fn last_flight(&self) -> Option<&FlyTo> {
        self.flights.last()
    }

    fn allocate(&mut self) -> MarkerId {
        let id = MarkerId(self.next_id);
        self.next_id += 1;
        id
    }
}

impl Default for HeadlessMap {
    fn default() -> Self {
        Self::new(LatLng::new(40.7128, -74.0060), 13.0)
    }
}

impl MapAdapter for HeadlessMap {
    fn add_marker(&mut self, position: LatLng, style: MarkerStyle) -> MarkerId {
        let id = self.allocate();
        self.markers.insert(id, (position, style));
        id
    }

    fn add_layer(&mut self, graphic: LayerGraphic) -> MarkerId {
        let id = self.allocate();
        self.layers.insert(id, graphic);
        id
    }

    fn remove_layer(&mut self, id: MarkerId) -> bool {
        self.markers.remove(&id).is_some() || self.layers.remove(&id).is_some()
    }

    fn restyle_layer(&mut self, id: MarkerId, style: &LayerStyle) -> bool {
        match self.layers.get_mut(&id) {
            Some(graphic) => {
                graphic.set_style(style.clone());
                true
            }
            None => false,
        }
    }

    fn project(&self, position: LatLng, zoom: f64) -> ScreenPoint {
        mercator_project(position, zoom)
    }

    fn unproject(&self, point: ScreenPoint, zoom: f64) -> LatLng {
        mercator_unproject(point, zoom)
    }

    fn fly_to(&mut self, center: LatLng, zoom: f64, duration: Duration) {
        self.center = center;
        self.zoom = zoom;
        self.flights.push(FlyTo {
            center,
            zoom,
            duration,
        });
    }

    fn center(&self) -> LatLng {
        self.center
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }
}
