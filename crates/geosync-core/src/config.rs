//! Configuration management for GeoSync.
//!
//! This module provides the configuration system that supports:
//! - Loading from YAML files
//! - Environment variable overrides (`GEOSYNC__MAP__RADIUS_M=...`)
//! - Validation of all settings
//! - Reference point, data sources, timers, centering profiles, and logging

use crate::error::{ConfigError, Result};
use crate::geo;
use crate::types::{Category, LatLng, LayerKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Main application configuration.
///
/// # Examples
///
/// ```
/// use geosync_core::config::AppConfig;
///
/// let config = AppConfig::default();
/// assert!(config.validate().is_ok());
/// assert_eq!(config.map.click_tolerance_m, 100.0);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Reference point, radius, and click tolerance
    #[serde(default)]
    pub map: MapConfig,

    /// Feature collection and geocoding endpoints
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Timer durations
    #[serde(default)]
    pub timers: TimerConfig,

    /// Per-category centering profiles
    #[serde(default)]
    pub centering: CenteringConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_yaml(&contents)
    }

    /// Loads configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML cannot be parsed.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Loads configuration using the `config` crate, layering environment
    /// variables prefixed with `GEOSYNC` (separator `__`) over the file.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or merged.
    pub fn from_config_builder<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = config::Config::builder()
            .add_source(config::File::from(path).required(true))
            .add_source(
                config::Environment::with_prefix("GEOSYNC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::LoadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        config.try_deserialize().map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.map.validate()?;
        self.sources.validate()?;
        self.timers.validate()?;
        self.centering.validate()?;
        self.logging.parse_level()?;
        Ok(())
    }
}

/// Reference point and spatial thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    /// Reference coordinate that loaded features are filtered around
    #[serde(default = "default_reference")]
    pub reference: LatLng,

    /// Radius around the reference point, in meters
    #[serde(default = "default_radius_m")]
    pub radius_m: f64,

    /// Maximum distance for a map click to hit a feature, in meters
    #[serde(default = "default_click_tolerance_m")]
    pub click_tolerance_m: f64,
}

fn default_reference() -> LatLng {
    // Lower Manhattan
    LatLng::new(40.7128, -74.0060)
}

fn default_radius_m() -> f64 {
    geo::miles_to_meters(3.0)
}

fn default_click_tolerance_m() -> f64 {
    100.0
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            reference: default_reference(),
            radius_m: default_radius_m(),
            click_tolerance_m: default_click_tolerance_m(),
        }
    }
}

impl MapConfig {
    /// Radius in miles.
    pub fn radius_miles(&self) -> f64 {
        geo::meters_to_miles(self.radius_m)
    }

    fn validate(&self) -> Result<()> {
        if !self.reference.is_valid() {
            return Err(ConfigError::invalid_value(
                "map.reference",
                format!("Invalid coordinate: {}", self.reference),
            )
            .into());
        }
        if !(self.radius_m.is_finite() && self.radius_m > 0.0) {
            return Err(ConfigError::invalid_value("map.radius_m", "Radius must be positive").into());
        }
        if !(self.click_tolerance_m.is_finite() && self.click_tolerance_m > 0.0) {
            return Err(ConfigError::invalid_value(
                "map.click_tolerance_m",
                "Tolerance must be positive",
            )
            .into());
        }
        Ok(())
    }
}

/// Data source endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Base URL joined with relative layer URLs
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Feature collection URL per layer
    #[serde(default = "default_layer_urls")]
    pub layers: HashMap<LayerKey, String>,

    /// Geocoding search endpoint
    #[serde(default = "default_geocode_url")]
    pub geocode_url: String,

    /// Maximum geocoding results per query
    #[serde(default = "default_geocode_limit")]
    pub geocode_limit: usize,

    /// Request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_layer_urls() -> HashMap<LayerKey, String> {
    HashMap::from([
        (LayerKey::CoffeeShops, "/data/coffee_shops.geojson".to_string()),
        (LayerKey::FootTraffic, "/data/foot_traffic.geojson".to_string()),
        (LayerKey::SubwayStations, "/data/subway_stations.geojson".to_string()),
        (LayerKey::Storefronts, "/data/storefronts.geojson".to_string()),
    ])
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_geocode_url() -> String {
    "https://photon.komoot.io/api/".to_string()
}

fn default_geocode_limit() -> usize {
    5
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            layers: default_layer_urls(),
            geocode_url: default_geocode_url(),
            geocode_limit: default_geocode_limit(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl SourcesConfig {
    /// URL configured for a layer.
    pub fn url_for(&self, key: LayerKey) -> Option<&str> {
        self.layers.get(&key).map(String::as_str)
    }

    /// Absolute URL for a layer; relative URLs are joined to `base_url`.
    pub fn resolved_url(&self, key: LayerKey) -> Option<String> {
        let url = self.url_for(key)?;
        if url.starts_with("http://") || url.starts_with("https://") {
            return Some(url.to_string());
        }
        Some(format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        ))
    }

    /// Request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        for (key, url) in &self.layers {
            if url.trim().is_empty() {
                return Err(ConfigError::invalid_value(
                    format!("sources.layers.{}", key),
                    "URL cannot be empty",
                )
                .into());
            }
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "sources.request_timeout_ms",
                "Timeout cannot be 0",
            )
            .into());
        }
        Ok(())
    }
}

/// Timer durations, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Lifetime of the transient highlight marker
    #[serde(default = "default_highlight_ms")]
    pub highlight_ms: u64,

    /// Quiet period before a search query is sent
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,

    /// Lifetime of a transient notification
    #[serde(default = "default_notification_ms")]
    pub notification_ms: u64,

    /// Pan/zoom animation duration
    #[serde(default = "default_pan_animation_ms")]
    pub pan_animation_ms: u64,

    /// How long heat layers wait for the heat renderer to load
    #[serde(default = "default_plugin_wait_ms")]
    pub plugin_wait_ms: u64,
}

fn default_highlight_ms() -> u64 {
    3_000
}

fn default_search_debounce_ms() -> u64 {
    300
}

fn default_notification_ms() -> u64 {
    4_500
}

fn default_pan_animation_ms() -> u64 {
    500
}

fn default_plugin_wait_ms() -> u64 {
    10_000
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            highlight_ms: default_highlight_ms(),
            search_debounce_ms: default_search_debounce_ms(),
            notification_ms: default_notification_ms(),
            pan_animation_ms: default_pan_animation_ms(),
            plugin_wait_ms: default_plugin_wait_ms(),
        }
    }
}

impl TimerConfig {
    pub fn highlight(&self) -> Duration {
        Duration::from_millis(self.highlight_ms)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn notification(&self) -> Duration {
        Duration::from_millis(self.notification_ms)
    }

    pub fn pan_animation(&self) -> Duration {
        Duration::from_millis(self.pan_animation_ms)
    }

    pub fn plugin_wait(&self) -> Duration {
        Duration::from_millis(self.plugin_wait_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.highlight_ms == 0 {
            return Err(ConfigError::invalid_value("timers.highlight_ms", "Cannot be 0").into());
        }
        if self.notification_ms == 0 {
            return Err(ConfigError::invalid_value("timers.notification_ms", "Cannot be 0").into());
        }
        if self.plugin_wait_ms == 0 {
            return Err(ConfigError::invalid_value("timers.plugin_wait_ms", "Cannot be 0").into());
        }
        Ok(())
    }
}

/// Vertical offset and zoom used when centering on a feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CenteringProfile {
    /// Fraction of the visible map height the target is raised above the midline
    pub vertical_offset_fraction: f64,

    /// Destination zoom level
    pub zoom: u8,
}

impl CenteringProfile {
    pub const fn new(vertical_offset_fraction: f64, zoom: u8) -> Self {
        Self {
            vertical_offset_fraction,
            zoom,
        }
    }

    /// Built-in profile for a category.
    pub fn default_for(category: Category) -> Self {
        match category {
            Category::PointsOfInterest => Self::new(0.25, 16),
            Category::FootTraffic => Self::new(0.10, 16),
            Category::Transit => Self::new(0.30, 16),
            // Storefronts are small and dense
            Category::Availability => Self::new(0.50, 17),
        }
    }
}

/// Centering profile overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CenteringConfig {
    /// Profile per category; missing categories use the built-in profile
    #[serde(default)]
    pub profiles: HashMap<Category, CenteringProfile>,
}

impl CenteringConfig {
    /// Effective profile for a category.
    pub fn profile(&self, category: Category) -> CenteringProfile {
        self.profiles
            .get(&category)
            .copied()
            .unwrap_or_else(|| CenteringProfile::default_for(category))
    }

    fn validate(&self) -> Result<()> {
        for (category, profile) in &self.profiles {
            if !(0.0..=1.0).contains(&profile.vertical_offset_fraction) {
                return Err(ConfigError::invalid_value(
                    format!("centering.profiles.{:?}", category),
                    "vertical_offset_fraction must be between 0 and 1",
                )
                .into());
            }
            if profile.zoom > 22 {
                return Err(ConfigError::invalid_value(
                    format!("centering.profiles.{:?}", category),
                    "zoom must be at most 22",
                )
                .into());
            }
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "text" or "json"
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    /// Parses the log level string to a tracing Level.
    pub fn parse_level(&self) -> Result<Level> {
        self.level.parse().map_err(|_| {
            ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                reason: format!("Invalid log level: {}", self.level),
            }
            .into()
        })
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON format for structured logging
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.map.radius_miles() - 3.0).abs() < 1e-9);
        assert_eq!(config.timers.highlight(), Duration::from_secs(3));
        assert_eq!(config.timers.search_debounce(), Duration::from_millis(300));
        assert_eq!(config.timers.plugin_wait(), Duration::from_secs(10));
        assert_eq!(
            config.sources.url_for(LayerKey::CoffeeShops),
            Some("/data/coffee_shops.geojson")
        );
        assert_eq!(config.sources.url_for(LayerKey::Radius), None);
    }

    #[test]
    fn test_resolved_url() {
        let mut sources = SourcesConfig::default();
        sources.base_url = "http://tiles.local/".to_string();
        assert_eq!(
            sources.resolved_url(LayerKey::Storefronts).as_deref(),
            Some("http://tiles.local/data/storefronts.geojson")
        );

        sources
            .layers
            .insert(LayerKey::Storefronts, "https://cdn.example.com/s.geojson".to_string());
        assert_eq!(
            sources.resolved_url(LayerKey::Storefronts).as_deref(),
            Some("https://cdn.example.com/s.geojson")
        );
        assert_eq!(sources.resolved_url(LayerKey::Radius), None);
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
map:
  reference: { lat: 37.7749, lng: -122.4194 }
  radius_m: 2000
sources:
  layers:
    coffee_shops: http://localhost:8000/coffee.geojson
  geocode_url: http://localhost:2322/api
centering:
  profiles:
    transit: { vertical_offset_fraction: 0.2, zoom: 15 }
logging:
  level: debug
  format: json
"#;

        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.map.reference, LatLng::new(37.7749, -122.4194));
        assert_eq!(config.map.radius_m, 2000.0);
        assert_eq!(config.map.click_tolerance_m, 100.0);
        assert_eq!(config.sources.layers.len(), 1);
        assert_eq!(config.centering.profile(Category::Transit).zoom, 15);
        assert_eq!(
            config.centering.profile(Category::Availability),
            CenteringProfile::new(0.5, 17)
        );
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(AppConfig::from_yaml("map: [1, 2").is_err());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.map.radius_m = -1.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.map.reference = LatLng::new(120.0, 0.0);
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config
            .centering
            .profiles
            .insert(Category::Transit, CenteringProfile::new(1.5, 16));
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_profiles_within_range() {
        for category in Category::ALL {
            let profile = CenteringProfile::default_for(category);
            assert!((0.1..=0.5).contains(&profile.vertical_offset_fraction));
            assert!(profile.zoom == 16 || profile.zoom == 17);
        }
    }
}
