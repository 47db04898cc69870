//! Common test utilities and helpers for integration tests

#![allow(dead_code)]

use async_channel::Receiver;
use geosync::map::{FeatureLoader, HeadlessMap, PluginGate, SharedMap, StaticFeatureSource};
use geosync::{MapSession, SessionEvent};
use geosync_core::config::AppConfig;
use geosync_core::types::{FeatureCollection, LayerKey};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// Get the path to test fixtures
pub fn fixtures_dir() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir).join("tests").join("fixtures")
}

/// Fixture file backing a layer
pub fn fixture_name(key: LayerKey) -> Option<&'static str> {
    match key {
        LayerKey::CoffeeShops => Some("coffee_shops.geojson"),
        LayerKey::FootTraffic => Some("foot_traffic.geojson"),
        LayerKey::SubwayStations => Some("subway_stations.geojson"),
        LayerKey::Storefronts => Some("storefronts.geojson"),
        LayerKey::Radius => None,
    }
}

/// Load a fixture as a static source
pub fn fixture_source(name: &str) -> StaticFeatureSource {
    let path = fixtures_dir().join(name);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|_| panic!("Failed to read fixture {:?}", path));
    StaticFeatureSource::from_json(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture {:?}: {}", path, e))
}

/// Load a fixture as an unfiltered collection
pub fn fixture_collection(name: &str) -> FeatureCollection {
    let path = fixtures_dir().join(name);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|_| panic!("Failed to read fixture {:?}", path));
    let value: serde_json::Value =
        serde_json::from_str(&content).expect("Failed to parse fixture JSON");
    FeatureCollection::from_value(&value).expect("Fixture has no features array")
}

/// Loader with every data layer backed by its fixture
pub fn fixture_loader(config: &AppConfig) -> FeatureLoader {
    LayerKey::ALL
        .into_iter()
        .filter_map(|key| fixture_name(key).map(|name| (key, name)))
        .fold(
            FeatureLoader::new(config.map.reference, config.map.radius_m),
            |loader, (key, name)| loader.with_source(key, Arc::new(fixture_source(name))),
        )
}

pub struct TestSession {
    pub map: Arc<Mutex<HeadlessMap>>,
    pub session: MapSession,
    pub events: Receiver<SessionEvent>,
}

/// Session over the fixtures with the heat plugin already loaded
pub fn fixture_session() -> TestSession {
    let config = AppConfig::default();
    let map = HeadlessMap::new(config.map.reference, 13.0).shared();
    let shared: SharedMap = map.clone();
    let loader = fixture_loader(&config);
    let (session, events) = MapSession::new(config, shared, loader, PluginGate::opened());
    session.set_panel_size(900.0, 350.0);
    TestSession {
        map,
        session,
        events,
    }
}

/// Take every event queued so far
pub fn drain(events: &Receiver<SessionEvent>) -> Vec<SessionEvent> {
    std::iter::from_fn(|| events.try_recv().ok()).collect()
}
