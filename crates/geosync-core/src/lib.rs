//! # GeoSync Core
//!
//! Core types, geodesy helpers, error handling, and configuration for the
//! GeoSync map/table synchronization engine.
//!
//! - **Types**: `LatLng`, the tolerant GeoJSON `Feature` / `FeatureCollection`
//!   model, and the `Category` / `LayerKey` identifiers.
//! - **Geo**: haversine distance and mile/meter conversions.
//! - **Errors**: `thiserror` taxonomy for fetch, parse, config, and layer
//!   failures. Data errors elsewhere degrade to defaults instead.
//! - **Configuration**: YAML files with environment variable overrides.
//!
//! ## Example
//!
//! ```
//! use geosync_core::types::{Feature, FeatureCollection, LatLng};
//! use geosync_core::geo::miles_to_meters;
//!
//! let center = LatLng::new(40.7128, -74.0060);
//! let near = Feature::point(LatLng::new(40.7130, -74.0050), Default::default());
//! let far = Feature::point(LatLng::new(41.5, -74.0), Default::default());
//!
//! let collection = FeatureCollection::new(vec![near, far]);
//! let within = collection.filter_by_radius(center, miles_to_meters(3.0));
//! assert_eq!(within.len(), 1);
//! ```

pub mod config;
pub mod error;
pub mod geo;
pub mod types;

// Re-export commonly used types for convenience
pub use config::{AppConfig, CenteringProfile};
pub use error::{GeoSyncError, Result};
pub use types::{
    Category, Feature, FeatureCollection, Geometry, LatLng, LayerKey, LayerKind, MarkerId,
    ScreenPoint,
};
