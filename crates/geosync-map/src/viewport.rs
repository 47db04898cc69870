//! Viewport-aware centering.
//!
//! When the table panel is open it covers the bottom of the map container.
//! The target is projected at the destination zoom, the center is moved
//! south of it by a fraction of the visible map height, and the result is
//! unprojected to get the center passed to `fly_to`. The target then renders
//! above the container midline, inside the uncovered strip.

use crate::adapter::MapAdapter;
use geosync_core::config::CenteringProfile;
use geosync_core::types::{LatLng, ScreenPoint};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default pan/zoom animation length.
pub const DEFAULT_ANIMATION: Duration = Duration::from_millis(500);

/// Panel geometry reported by the hosting UI, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PanelGeometry {
    pub container_height: f64,
    pub table_height: f64,
    pub show_table: bool,
    /// Informational; `container_height` already reflects fullscreen mode
    pub fullscreen: bool,
}

impl PanelGeometry {
    /// Height of the map not covered by the table panel, never negative.
    pub fn visible_map_height(&self) -> f64 {
        let height = if self.show_table {
            self.container_height - self.table_height
        } else {
            self.container_height
        };
        height.max(0.0)
    }
}

/// Center that places `target` clear of the table panel at the profile's zoom.
///
/// The center sits `visible_map_height * vertical_offset_fraction` pixels
/// below the projected target (screen y grows downward).
pub fn compute_center(
    adapter: &dyn MapAdapter,
    target: LatLng,
    profile: &CenteringProfile,
    geometry: &PanelGeometry,
) -> LatLng {
    let zoom = f64::from(profile.zoom);
    let offset = geometry.visible_map_height() * profile.vertical_offset_fraction;
    let projected = adapter.project(target, zoom);
    adapter.unproject(ScreenPoint::new(projected.x, projected.y + offset), zoom)
}

/// Computes the center and issues the animated pan/zoom.
pub fn center_target(
    adapter: &mut dyn MapAdapter,
    target: LatLng,
    profile: &CenteringProfile,
    geometry: &PanelGeometry,
    animation: Duration,
) -> LatLng {
    let center = compute_center(adapter, target, profile, geometry);
    debug!(
        target = %target,
        center = %center,
        zoom = profile.zoom,
        visible_height = geometry.visible_map_height(),
        "Centering on target"
    );
    adapter.fly_to(center, f64::from(profile.zoom), animation);
    center
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{mercator_project, HeadlessMap};
    use geosync_core::types::Category;

    fn geometry(show_table: bool) -> PanelGeometry {
        PanelGeometry {
            container_height: 800.0,
            table_height: 300.0,
            show_table,
            fullscreen: false,
        }
    }

    #[test]
    fn test_visible_map_height() {
        assert_eq!(geometry(true).visible_map_height(), 500.0);
        assert_eq!(geometry(false).visible_map_height(), 800.0);

        let covered = PanelGeometry {
            container_height: 200.0,
            table_height: 300.0,
            show_table: true,
            fullscreen: true,
        };
        assert_eq!(covered.visible_map_height(), 0.0);
    }

    #[test]
    fn test_offset_is_fraction_of_visible_height() {
        let map = HeadlessMap::default();
        let target = LatLng::new(40.7128, -74.0060);
        let profile = CenteringProfile::new(0.25, 16);

        let center = compute_center(&map, target, &profile, &geometry(true));
        let dy = mercator_project(center, 16.0).y - mercator_project(target, 16.0).y;
        assert!((dy - 125.0).abs() < 1e-6);
        assert!((center.lng - target.lng).abs() < 1e-9);
        assert!(center.lat < target.lat);
    }

    #[test]
    fn test_target_lands_above_table_panel() {
        let map = HeadlessMap::default();
        let target = LatLng::new(40.7128, -74.0060);

        for show_table in [true, false] {
            let geometry = geometry(show_table);
            for category in Category::ALL {
                let profile = CenteringProfile::default_for(category);
                let zoom = f64::from(profile.zoom);
                let center = compute_center(&map, target, &profile, &geometry);

                let dy = mercator_project(target, zoom).y - mercator_project(center, zoom).y;
                let screen_y = geometry.container_height / 2.0 + dy;
                assert!(screen_y > -1e-6, "{} above the container", category);
                assert!(
                    screen_y < geometry.visible_map_height(),
                    "{} at y={} hidden behind the table",
                    category,
                    screen_y
                );
            }
        }
    }

    #[test]
    fn test_zero_fraction_centers_on_target() {
        let map = HeadlessMap::default();
        let target = LatLng::new(40.7128, -74.0060);
        let center = compute_center(&map, target, &CenteringProfile::new(0.0, 17), &geometry(true));
        assert!((center.lat - target.lat).abs() < 1e-9);
    }

    #[test]
    fn test_center_target_flies_with_animation() {
        let mut map = HeadlessMap::default();
        let target = LatLng::new(40.73, -73.99);
        let profile = CenteringProfile::new(0.5, 17);

        let center = center_target(&mut map, target, &profile, &geometry(false), DEFAULT_ANIMATION);
        let flight = map.last_flight().unwrap();
        assert_eq!(flight.center, center);
        assert_eq!(flight.zoom, 17.0);
        assert_eq!(flight.duration, Duration::from_millis(500));
    }
}
