//! # GeoSync Map
//!
//! Everything that touches the map.
//!
//! - **Adapter**: the [`MapAdapter`] seam and an in-memory [`HeadlessMap`].
//! - **Viewport**: centering a target clear of the table panel.
//! - **Highlight**: the transient highlight marker cycle.
//! - **Loader**: fail-soft, cancelable feature collection loading.
//! - **Layers**: build-once layers with buffered visibility.
//! - **Geocode**: debounced free-text location search.
//! - **Notify**: auto-dismissing notifications.
//! - **Timers**: named, cancelable one-shot timers behind all of the above.

pub mod adapter;
pub mod geocode;
pub mod highlight;
pub mod layers;
pub mod loader;
pub mod notify;
pub mod timers;
pub mod viewport;

pub use adapter::{
    FlyTo, HeadlessMap, LayerGraphic, LayerStyle, MapAdapter, MarkerStyle, SharedMap, TILE_SIZE,
};
pub use geocode::{DebouncedSearch, GeocodeClient, GeocodeResult, Geocoder};
pub use highlight::{Highlight, HighlightController, HighlightPhase};
pub use layers::{
    BuiltLayer, LayerRegistry, LayerState, Palette, PluginGate, PluginState, DEFAULT_PLUGIN_WAIT,
};
pub use loader::{FeatureLoader, FeatureSource, HttpFeatureSource, StaticFeatureSource};
pub use notify::{Notification, NotificationLevel, Notifier};
pub use timers::TimerSet;
pub use viewport::{compute_center, center_target, PanelGeometry, DEFAULT_ANIMATION};
