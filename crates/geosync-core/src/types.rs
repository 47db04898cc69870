//! Core types for the GeoSync map/table synchronization engine.
//!
//! This module defines the geographic primitives, the tolerant GeoJSON feature
//! model, and the category/layer identifiers shared by every other crate.
//! Geometries are decoded with the `geojson` crate; a feature keeps its
//! properties even when its geometry is rejected.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::geo;

/// A geographic coordinate in degrees.
///
/// GeoJSON stores coordinates as `[lng, lat]`; this type always names the
/// components explicitly so the order can never be confused.
///
/// # Examples
///
/// ```
/// use geosync_core::types::LatLng;
///
/// let nyc = LatLng::new(40.7128, -74.0060);
/// assert!(nyc.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in degrees (-90..=90)
    pub lat: f64,
    /// Longitude in degrees (-180..=180)
    pub lng: f64,
}

impl LatLng {
    /// Creates a new coordinate.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns true if both components are finite and inside the WGS84 range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance_to(&self, other: &LatLng) -> f64 {
        geo::haversine_m(*self, *other)
    }

    /// Builds a coordinate from a GeoJSON `[lng, lat, ...]` position.
    pub fn from_position(position: &[f64]) -> Option<Self> {
        match position {
            [lng, lat, ..] => {
                let point = Self::new(*lat, *lng);
                point.is_valid().then_some(point)
            }
            _ => None,
        }
    }

    /// Coordinate of a valid `Point` geometry.
    pub fn from_geometry(geometry: &Geometry) -> Option<Self> {
        match &geometry.value {
            geojson::Value::Point(position) => Self::from_position(position),
            _ => None,
        }
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lng)
    }
}

/// A point in map container space, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Handle of a marker or layer group owned by a map adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerId(pub u64);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "marker-{}", self.0)
    }
}

pub use geojson::Geometry;

/// A `Point` geometry at `position`.
pub fn point_geometry(position: LatLng) -> Geometry {
    Geometry::new(geojson::Value::Point(vec![position.lng, position.lat]))
}

/// GeoJSON type name of a geometry.
pub fn geometry_type_name(geometry: &Geometry) -> &'static str {
    match &geometry.value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// A single geometry + properties record.
///
/// Identity is not guaranteed by source data; the table layer derives a
/// positional `Feature ID` instead.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Feature {
    /// Geometry, `None` when missing or rejected by the GeoJSON decoder
    pub geometry: Option<Geometry>,

    /// Property bag; anything but a JSON object decodes as empty
    pub properties: Map<String, Value>,
}

impl<'de> Deserialize<'de> for Feature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Feature::from_json_value(&value).ok_or_else(|| D::Error::custom("feature is not a JSON object"))
    }
}

const LAT_KEYS: [&str; 2] = ["lat", "latitude"];
const LNG_KEYS: [&str; 4] = ["lng", "lon", "long", "longitude"];

impl Feature {
    /// Creates a point feature with the given properties.
    pub fn point(position: LatLng, properties: Map<String, Value>) -> Self {
        Self {
            geometry: Some(point_geometry(position)),
            properties,
        }
    }

    /// Decodes one collection entry.
    ///
    /// Returns `None` when the entry is not a JSON object. The `type` member
    /// is not required, since many sources omit it on features.
    pub fn from_json_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let geometry = match object.get("geometry") {
            None | Some(Value::Null) => None,
            Some(raw) => match Geometry::from_json_value(raw.clone()) {
                Ok(geometry) => Some(geometry),
                Err(e) => {
                    debug!(error = %e, "Dropping undecodable geometry");
                    None
                }
            },
        };
        let properties = match object.get("properties") {
            Some(Value::Object(properties)) => properties.clone(),
            _ => Map::new(),
        };
        Some(Self {
            geometry,
            properties,
        })
    }

    /// Returns the coordinate of a valid `Point` geometry.
    pub fn point_position(&self) -> Option<LatLng> {
        self.geometry.as_ref().and_then(LatLng::from_geometry)
    }

    /// Returns the feature location: the Point geometry, or explicit
    /// latitude/longitude properties when the geometry is absent.
    pub fn location(&self) -> Option<LatLng> {
        self.point_position().or_else(|| {
            let lat = LAT_KEYS
                .iter()
                .find_map(|k| self.properties.get(*k).and_then(value_as_f64))?;
            let lng = LNG_KEYS
                .iter()
                .find_map(|k| self.properties.get(*k).and_then(value_as_f64))?;
            let position = LatLng::new(lat, lng);
            position.is_valid().then_some(position)
        })
    }

    /// Geometry type, or `"Unknown"` when the geometry is missing.
    pub fn geometry_type(&self) -> &'static str {
        self.geometry
            .as_ref()
            .map(geometry_type_name)
            .unwrap_or("Unknown")
    }

    /// Display form of a property, `None` when the key is absent.
    pub fn property_display(&self, key: &str) -> Option<String> {
        self.properties.get(key).map(display_value)
    }
}

/// Numeric view of a JSON scalar; numeric strings are accepted.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|v: &f64| v.is_finite())
}

/// Converts a property value into its table display string.
///
/// Strings are used verbatim, `null` becomes the empty string, and every
/// other value uses its JSON text (objects and arrays are serialized).
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Ordered sequence of features from one source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Creates a collection from features.
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    /// Decodes any JSON document into a collection.
    ///
    /// Returns `None` when the document has no `features` array. Individual
    /// entries that are not objects are skipped.
    pub fn from_value(value: &Value) -> Option<Self> {
        let raw = value.get("features")?.as_array()?;
        let mut features = Vec::with_capacity(raw.len());
        for (index, entry) in raw.iter().enumerate() {
            match Feature::from_json_value(entry) {
                Some(feature) => features.push(feature),
                None => debug!(index, "Skipping non-object feature"),
            }
        }
        Some(Self { features })
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns true if the collection has no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Iterates over features.
    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    /// Keeps the features located within `radius_m` meters of `center`.
    ///
    /// Features without a usable location are dropped, so every retained
    /// feature has one.
    pub fn filter_by_radius(&self, center: LatLng, radius_m: f64) -> Self {
        let features = self
            .features
            .iter()
            .filter(|f| {
                f.location()
                    .is_some_and(|p| geo::haversine_m(center, p) <= radius_m)
            })
            .cloned()
            .collect();
        Self { features }
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

/// Logical table category.
///
/// Each category owns one table in the table set and one matching/centering
/// strategy. The declaration order is the table index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Points of interest (coffee shops)
    PointsOfInterest,
    /// Foot traffic samples
    FootTraffic,
    /// Transit (subway stations)
    Transit,
    /// Storefront availability
    Availability,
}

impl Category {
    /// All categories in table order.
    pub const ALL: [Category; 4] = [
        Category::PointsOfInterest,
        Category::FootTraffic,
        Category::Transit,
        Category::Availability,
    ];

    /// Table index of this category.
    pub fn index(self) -> usize {
        match self {
            Category::PointsOfInterest => 0,
            Category::FootTraffic => 1,
            Category::Transit => 2,
            Category::Availability => 3,
        }
    }

    /// Category for a table index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Human-readable table title.
    pub fn title(self) -> &'static str {
        match self {
            Category::PointsOfInterest => "Coffee Shops",
            Category::FootTraffic => "Foot Traffic",
            Category::Transit => "Subway Stations",
            Category::Availability => "Storefront Availability",
        }
    }

    /// The layer whose visibility gates map clicks for this category.
    pub fn layer_key(self) -> LayerKey {
        match self {
            Category::PointsOfInterest => LayerKey::CoffeeShops,
            Category::FootTraffic => LayerKey::FootTraffic,
            Category::Transit => LayerKey::SubwayStations,
            Category::Availability => LayerKey::Storefronts,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// How a layer is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// One marker per feature
    Markers,
    /// Heat layer weighted by a feature property
    Heat,
    /// The reference radius circle
    Circle,
}

/// Identifier of a toggle-able map layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKey {
    CoffeeShops,
    FootTraffic,
    Radius,
    SubwayStations,
    Storefronts,
}

impl LayerKey {
    /// All layer keys.
    pub const ALL: [LayerKey; 5] = [
        LayerKey::CoffeeShops,
        LayerKey::FootTraffic,
        LayerKey::Radius,
        LayerKey::SubwayStations,
        LayerKey::Storefronts,
    ];

    /// Registry name of the layer.
    pub fn as_str(self) -> &'static str {
        match self {
            LayerKey::CoffeeShops => "coffeeShops",
            LayerKey::FootTraffic => "footTraffic",
            LayerKey::Radius => "radius",
            LayerKey::SubwayStations => "subwayStations",
            LayerKey::Storefronts => "storefronts",
        }
    }

    /// Drawing kind of the layer.
    pub fn kind(self) -> LayerKind {
        match self {
            LayerKey::CoffeeShops | LayerKey::SubwayStations | LayerKey::Storefronts => {
                LayerKind::Markers
            }
            LayerKey::FootTraffic => LayerKind::Heat,
            LayerKey::Radius => LayerKind::Circle,
        }
    }

    /// Category whose data backs the layer; the radius circle has none.
    pub fn category(self) -> Option<Category> {
        match self {
            LayerKey::CoffeeShops => Some(Category::PointsOfInterest),
            LayerKey::FootTraffic => Some(Category::FootTraffic),
            LayerKey::SubwayStations => Some(Category::Transit),
            LayerKey::Storefronts => Some(Category::Availability),
            LayerKey::Radius => None,
        }
    }

    /// Returns true if building the layer requires a network fetch.
    pub fn needs_data(self) -> bool {
        self.category().is_some()
    }
}

impl fmt::Display for LayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayerKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LayerKey::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown layer key: {}", s))
    }
}
