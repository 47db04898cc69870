//! End-to-end map/table synchronization over the GeoJSON fixtures

mod common;

use common::{drain, fixture_collection, fixture_session};
use geosync::map::{LayerGraphic, LayerState, NotificationLevel};
use geosync::{SessionEvent, UiAction};
use geosync_core::config::AppConfig;
use geosync_core::geo::miles_to_meters;
use geosync_core::types::{Category, LatLng, LayerKey};
use geosync_table::{project, FEATURE_ID_HEADER, GEOMETRY_TYPE_HEADER};
use std::collections::HashSet;
use std::time::Duration;

#[test]
fn test_three_in_two_out_scenario() {
    let config = AppConfig::default();
    let collection = fixture_collection("coffee_shops.geojson");
    assert_eq!(collection.len(), 5);

    let within = collection.filter_by_radius(config.map.reference, miles_to_meters(3.0));
    let table = project(&within);

    assert_eq!(table.row_count(), 3);
    assert_eq!(table.headers[0], FEATURE_ID_HEADER);
    assert_eq!(table.headers[1], GEOMETRY_TYPE_HEADER);
    for key in ["name", "rating", "neighborhood", "hours", "wifi"] {
        assert!(table.has_column(key), "missing column {}", key);
    }

    let names: Vec<&str> = table.column_values("name").collect();
    assert_eq!(names, vec!["Blue Bottle", "Joe Coffee", "Stumptown"]);
    assert_eq!(table.cell(1, "hours"), Some(r#"["07:00","19:00"]"#));
    assert_eq!(table.cell(2, "wifi"), Some(""));
}

#[tokio::test(start_paused = true)]
async fn test_load_builds_every_layer() {
    let t = fixture_session();
    t.session.load().await;

    for key in LayerKey::ALL {
        assert_eq!(t.session.layers().state(key), LayerState::Built, "{}", key);
    }
    assert_eq!(t.map.lock().layer_count(), 2);

    let events = drain(&t.events);
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::LayersReady { ready, failed } if ready.len() == 5 && failed.is_empty()
    )));

    let counts = t.session.with_engine(|engine| {
        Category::ALL
            .iter()
            .map(|&c| engine.table(c).row_count())
            .collect::<Vec<_>>()
    });
    // The station without a location is dropped by the radius filter
    assert_eq!(counts, vec![3, 3, 2, 2]);
}

#[tokio::test(start_paused = true)]
async fn test_map_click_follows_active_table_and_visibility() {
    let t = fixture_session();
    t.session.load().await;

    let click = t
        .session
        .on_map_click(LatLng::new(40.73361, -73.99691))
        .unwrap();
    assert_eq!(click.category, Category::PointsOfInterest);
    assert_eq!(click.row, Some(1));
    assert!(click.distance_m < 5.0);

    // Subway stations are hidden until toggled on
    t.session
        .with_engine(|engine| engine.set_active_table(Category::Transit));
    assert!(t.session.on_map_click(LatLng::new(40.7359, -73.9904)).is_none());

    assert!(t.session.set_layer_visible(LayerKey::SubwayStations, true));
    let click = t
        .session
        .on_map_click(LatLng::new(40.7359, -73.9904))
        .unwrap();
    assert_eq!(click.row, Some(1));
    assert_eq!(t.session.with_engine(|e| e.selection().row), Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_click_on_property_located_storefront() {
    let t = fixture_session();
    t.session.load().await;
    t.session
        .with_engine(|engine| engine.set_active_table(Category::Availability));
    assert!(t.session.set_layer_visible(LayerKey::Storefronts, true));

    // 88 Greenwich Ave has no geometry, only lat/lng properties
    let click = t
        .session
        .on_map_click(LatLng::new(40.7375, -74.0010))
        .unwrap();
    assert_eq!(click.feature_index, 1);
    assert_eq!(click.row, Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_click_after_sort_selects_matching_row() {
    let t = fixture_session();
    t.session.load().await;
    t.session.with_engine(|engine| {
        engine.sort("name", geosync_table::SortDirection::Descending)
    });

    // Blue Bottle sorts last
    let click = t.session.on_map_click(LatLng::new(40.7130, -74.0050)).unwrap();
    assert_eq!(click.feature_index, 0);
    assert_eq!(click.row, Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_row_select_centers_and_highlights() {
    let t = fixture_session();
    t.session.load().await;

    t.session
        .with_engine(|engine| engine.set_active_table(Category::Availability));
    let highlight = t.session.on_row_select(1).unwrap();
    assert_eq!(highlight.target, LatLng::new(40.7375, -74.0010));

    let flight = *t.map.lock().last_flight().unwrap();
    assert_eq!(flight.zoom, 17.0);
    assert_eq!(flight.center, highlight.center);
    assert!(highlight.center.lat < highlight.target.lat);
    assert_eq!(t.map.lock().marker_count(), 1);

    // A second selection replaces the first highlight
    let second = t.session.on_row_select(0).unwrap();
    assert_ne!(second.marker, highlight.marker);
    assert_eq!(t.map.lock().marker_count(), 1);

    tokio::time::sleep(Duration::from_millis(3_100)).await;
    assert_eq!(t.map.lock().marker_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_row_without_location_is_not_highlighted() {
    let t = fixture_session();
    t.session.load().await;

    t.session.with_engine(|engine| {
        assert!(engine.add_row());
        assert!(engine.edit_cell(3, "name", "Pop-up Cart"));
    });
    assert!(t.session.on_row_select(3).is_none());
    assert_eq!(t.map.lock().marker_count(), 0);
    assert!(t.map.lock().flights().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_filter_reset_round_trip_emits_events() {
    let t = fixture_session();
    t.session.load().await;
    drain(&t.events);

    let original = t.session.with_engine(|e| e.active_table().clone());
    t.session.with_engine(|engine| {
        let allowed: HashSet<String> = ["Stumptown".to_string()].into();
        assert!(engine.filter("name", Some(allowed)));
    });
    assert_eq!(t.session.with_engine(|e| e.active_table().row_count()), 1);

    assert!(t.session.reset_table(Category::PointsOfInterest));
    assert_eq!(t.session.with_engine(|e| e.active_table().clone()), original);
    assert!(!t.session.with_engine(|e| e.is_modified(Category::PointsOfInterest)));

    let events = drain(&t.events);
    let modified: Vec<bool> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::TableModified { modified, .. } => Some(*modified),
            _ => None,
        })
        .collect();
    assert_eq!(modified, vec![true, false]);
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::Notification(n) if n.level == NotificationLevel::Info
    )));
}

#[tokio::test(start_paused = true)]
async fn test_outside_click_respects_context_menu() {
    let t = fixture_session();
    t.session.load().await;
    t.session.with_engine(|e| e.select_cell(0, 2));

    t.session
        .dispatch(UiAction::OpenContextMenu { row: 0, column: 2 });
    assert!(!t.session.on_outside_click(false));

    t.session.dispatch(UiAction::CloseContextMenu);
    assert!(!t.session.on_outside_click(true));
    assert!(t.session.on_outside_click(false));
    assert!(t.session.with_engine(|e| e.selection().is_empty()));
}

#[tokio::test(start_paused = true)]
async fn test_hidden_table_panel_uses_full_height() {
    let t = fixture_session();
    t.session.load().await;

    let open = t.session.on_row_select(0).unwrap();
    t.session.dispatch(UiAction::ToggleTable);
    assert_eq!(t.session.panel_geometry().visible_map_height(), 900.0);
    let closed = t.session.on_row_select(0).unwrap();

    // A taller visible area moves the center further south of the target
    assert!(closed.center.lat < open.center.lat);
    assert!(closed.center.lat < closed.target.lat);
}

#[tokio::test(start_paused = true)]
async fn test_heat_layer_intensities() {
    let t = fixture_session();
    t.session.load().await;

    match t.session.layers().graphic(LayerKey::FootTraffic).unwrap() {
        LayerGraphic::Heat { points, .. } => {
            let intensities: Vec<f64> = points.iter().map(|p| p.intensity).collect();
            assert_eq!(intensities, vec![0.4, 1.0, 0.8]);
        }
        other => panic!("unexpected graphic {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_detaches_layers() {
    let t = fixture_session();
    t.session.load().await;
    t.session.on_row_select(0).unwrap();

    t.session.shutdown();
    assert_eq!(t.map.lock().layer_count(), 0);
    assert_eq!(t.map.lock().marker_count(), 0);
    assert!(t.events.is_closed());
}
