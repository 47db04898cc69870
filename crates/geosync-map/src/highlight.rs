//! Highlight cycle for a resolved feature.
//!
//! `Idle -> Resolving -> (Found -> Centering -> Highlighted -> Idle) |
//! (NotFound -> Idle)`
//!
//! Entering `Resolving` removes the previous transient marker and cancels
//! its removal timer, so at most one transient marker is on the map. A
//! highlighted marker removes itself after the configured delay.

use crate::adapter::{MarkerStyle, SharedMap};
use crate::timers::TimerSet;
use crate::viewport::{center_target, PanelGeometry};
use geosync_core::config::CenteringProfile;
use geosync_core::types::{LatLng, MarkerId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const REMOVAL_TIMER: &str = "highlight";

/// Color of the transient highlight marker.
pub const HIGHLIGHT_COLOR: &str = "#ff3b30";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightPhase {
    Idle,
    Resolving,
    Centering,
    Highlighted,
}

#[derive(Debug)]
struct HighlightState {
    phase: HighlightPhase,
    marker: Option<MarkerId>,
    generation: u64,
}

/// A completed highlight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub marker: MarkerId,
    pub target: LatLng,
    pub center: LatLng,
}

pub struct HighlightController {
    map: SharedMap,
    state: Arc<Mutex<HighlightState>>,
    timers: TimerSet,
    duration: Duration,
    animation: Duration,
}

impl HighlightController {
    pub fn new(map: SharedMap, duration: Duration, animation: Duration) -> Self {
        Self {
            map,
            state: Arc::new(Mutex::new(HighlightState {
                phase: HighlightPhase::Idle,
                marker: None,
                generation: 0,
            })),
            timers: TimerSet::new(),
            duration,
            animation,
        }
    }

    pub fn phase(&self) -> HighlightPhase {
        self.state.lock().phase
    }

    /// The transient marker currently on the map.
    pub fn active_marker(&self) -> Option<MarkerId> {
        self.state.lock().marker
    }

    /// Starts a new cycle, clearing the previous highlight.
    pub fn begin(&self) {
        self.timers.cancel(REMOVAL_TIMER);
        let mut state = self.state.lock();
        state.generation += 1;
        if let Some(marker) = state.marker.take() {
            self.map.lock().remove_layer(marker);
            debug!(%marker, "Removed previous highlight");
        }
        state.phase = HighlightPhase::Resolving;
    }

    /// Ends a cycle whose target could not be resolved.
    pub fn not_found(&self) {
        let mut state = self.state.lock();
        if state.phase == HighlightPhase::Resolving {
            state.phase = HighlightPhase::Idle;
            debug!("Highlight target not found");
        }
    }

    /// Centers on `target`, places the transient marker, and arms its
    /// removal timer on the runtime the controller was created under.
    pub fn found(
        &self,
        target: LatLng,
        profile: &CenteringProfile,
        geometry: &PanelGeometry,
    ) -> Highlight {
        let mut state = self.state.lock();
        if state.phase != HighlightPhase::Resolving {
            // found() without begin(): start a fresh cycle inline
            state.generation += 1;
            if let Some(marker) = state.marker.take() {
                self.map.lock().remove_layer(marker);
            }
            self.timers.cancel(REMOVAL_TIMER);
        }

        state.phase = HighlightPhase::Centering;
        let (center, marker) = {
            let mut map = self.map.lock();
            let center = center_target(&mut *map, target, profile, geometry, self.animation);
            let marker = map.add_marker(
                target,
                MarkerStyle {
                    color: HIGHLIGHT_COLOR.to_string(),
                    label: None,
                },
            );
            (center, marker)
        };
        state.marker = Some(marker);
        state.phase = HighlightPhase::Highlighted;
        let generation = state.generation;
        drop(state);

        let shared_state = Arc::clone(&self.state);
        let map = Arc::clone(&self.map);
        self.timers.schedule(REMOVAL_TIMER, self.duration, move || {
            let mut state = shared_state.lock();
            if state.generation != generation {
                return;
            }
            if let Some(marker) = state.marker.take() {
                map.lock().remove_layer(marker);
                debug!(%marker, "Highlight expired");
            }
            state.phase = HighlightPhase::Idle;
        });

        debug!(%marker, target = %target, "Highlighted feature");
        Highlight {
            marker,
            target,
            center,
        }
    }

    /// Removes the active highlight and cancels its timer.
    pub fn clear(&self) {
        self.timers.cancel_all();
        let mut state = self.state.lock();
        state.generation += 1;
        if let Some(marker) = state.marker.take() {
            self.map.lock().remove_layer(marker);
        }
        state.phase = HighlightPhase::Idle;
    }
}

impl Drop for HighlightController {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::HeadlessMap;

    fn setup() -> (Arc<Mutex<HeadlessMap>>, HighlightController) {
        let map = HeadlessMap::default().shared();
        let shared: SharedMap = map.clone();
        let controller =
            HighlightController::new(shared, Duration::from_secs(3), Duration::from_millis(500));
        (map, controller)
    }

    fn geometry() -> PanelGeometry {
        PanelGeometry {
            container_height: 800.0,
            table_height: 300.0,
            show_table: true,
            fullscreen: false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_found_then_expires() {
        let (map, controller) = setup();
        assert_eq!(controller.phase(), HighlightPhase::Idle);

        controller.begin();
        assert_eq!(controller.phase(), HighlightPhase::Resolving);

        let target = LatLng::new(40.72, -74.0);
        let highlight = controller.found(target, &CenteringProfile::new(0.25, 16), &geometry());
        assert_eq!(controller.phase(), HighlightPhase::Highlighted);
        assert_eq!(map.lock().marker_count(), 1);
        assert_eq!(map.lock().marker(highlight.marker).unwrap().0, target);
        assert_eq!(map.lock().last_flight().unwrap().center, highlight.center);

        tokio::time::sleep(Duration::from_millis(3_100)).await;
        assert_eq!(map.lock().marker_count(), 0);
        assert_eq!(controller.phase(), HighlightPhase::Idle);
        assert_eq!(controller.active_marker(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_returns_to_idle() {
        let (map, controller) = setup();
        controller.begin();
        controller.not_found();
        assert_eq!(controller.phase(), HighlightPhase::Idle);
        assert_eq!(map.lock().marker_count(), 0);
        assert!(map.lock().flights().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_active_highlight() {
        let (map, controller) = setup();
        let profile = CenteringProfile::new(0.25, 16);

        controller.begin();
        let first = controller.found(LatLng::new(40.72, -74.0), &profile, &geometry());

        tokio::time::sleep(Duration::from_secs(2)).await;
        controller.begin();
        assert_eq!(map.lock().marker_count(), 0);
        let second = controller.found(LatLng::new(40.73, -74.0), &profile, &geometry());
        assert_ne!(first.marker, second.marker);
        assert_eq!(map.lock().marker_count(), 1);

        // The first timer would have fired here; the second marker survives it
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(controller.active_marker(), Some(second.marker));
        assert_eq!(map.lock().marker_count(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(map.lock().marker_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_removes_marker_and_timer() {
        let (map, controller) = setup();
        controller.begin();
        controller.found(LatLng::new(40.72, -74.0), &CenteringProfile::new(0.1, 16), &geometry());
        drop(controller);

        assert_eq!(map.lock().marker_count(), 0);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(map.lock().marker_count(), 0);
    }
}
