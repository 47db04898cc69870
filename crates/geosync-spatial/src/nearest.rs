//! Nearest-feature resolution for map clicks.

use geosync_core::geo::haversine_m;
use geosync_core::types::{Feature, FeatureCollection, LatLng};

/// Default click tolerance in meters.
pub const DEFAULT_TOLERANCE_M: f64 = 100.0;

/// The closest feature to a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestHit<'a> {
    /// Position of the feature in the collection
    pub index: usize,
    /// Great-circle distance from the query point
    pub distance_m: f64,
    pub feature: &'a Feature,
}

/// Finds the feature closest to `point`.
///
/// The hit is returned only when its distance is strictly below
/// `tolerance_m`. Equal distances keep the first feature encountered.
/// Features are placed by [`Feature::location`], the same position their
/// markers are drawn at: the Point geometry, else latitude/longitude
/// properties. Features with neither are skipped.
pub fn find_nearest(
    point: LatLng,
    collection: &FeatureCollection,
    tolerance_m: f64,
) -> Option<NearestHit<'_>> {
    if !point.is_valid() {
        return None;
    }

    let mut best: Option<NearestHit<'_>> = None;
    for (index, feature) in collection.iter().enumerate() {
        let Some(position) = feature.location() else {
            continue;
        };
        let distance_m = haversine_m(point, position);
        if best.map_or(true, |b| distance_m < b.distance_m) {
            best = Some(NearestHit {
                index,
                distance_m,
                feature,
            });
        }
    }

    best.filter(|hit| hit.distance_m < tolerance_m)
}
