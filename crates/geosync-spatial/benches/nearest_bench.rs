//! Benchmarks for nearest-feature lookup and row correlation
//!
//! Run with: cargo bench --package geosync-spatial

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use geosync_core::types::{Category, Feature, FeatureCollection, LatLng, MarkerId};
use geosync_spatial::{find_nearest, CorrelationContext, Correlator, MarkerInfo};
use geosync_table::Row;
use serde_json::{json, Map};

fn create_collection(size: usize) -> FeatureCollection {
    (0..size)
        .map(|i| {
            let mut properties = Map::new();
            properties.insert("name".to_string(), json!(format!("Shop {i}")));
            let offset = (i % 1_000) as f64 * 0.0005;
            Feature::point(LatLng::new(40.70 + offset, -74.00 + offset), properties)
        })
        .collect()
}

fn bench_find_nearest(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_nearest");
    let query = LatLng::new(40.7251, -73.9749);

    for size in [100, 1_000, 10_000] {
        let collection = create_collection(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &collection, |b, collection| {
            b.iter(|| black_box(find_nearest(black_box(query), collection, 100.0)));
        });
    }

    group.finish();
}

fn bench_correlate(c: &mut Criterion) {
    let collection = create_collection(1_000);
    let markers: Vec<MarkerInfo> = collection
        .iter()
        .enumerate()
        .filter_map(|(i, f)| {
            let position = f.point_position()?;
            Some(MarkerInfo::new(MarkerId(i as u64), format!("Shop {i}"), position))
        })
        .collect();
    let ctx = CorrelationContext {
        markers: &markers,
        features: &collection,
    };
    let correlator = Correlator::default();
    let row: Row = [("name".to_string(), "Shop 999".to_string())].into();

    c.bench_function("correlate_marker_1000", |b| {
        b.iter(|| black_box(correlator.resolve(black_box(&row), Category::PointsOfInterest, &ctx)));
    });
}

criterion_group!(benches, bench_find_nearest, bench_correlate);
criterion_main!(benches);
