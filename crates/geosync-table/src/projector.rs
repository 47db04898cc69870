//! Feature collection → table projection.
//!
//! Every feature becomes one row. Headers are the two synthetic columns
//! followed by the sorted union of property keys, so repeated projections of
//! the same input always produce the same header order.

use crate::table::{Row, Table, FEATURE_ID_HEADER, GEOMETRY_TYPE_HEADER};
use geosync_core::types::{display_value, FeatureCollection};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

/// Projects a collection into a table.
///
/// Property keys that collide with a synthetic column are dropped; the
/// synthetic value wins.
pub fn project(collection: &FeatureCollection) -> Table {
    if collection.is_empty() {
        return Table::default();
    }

    let keys: BTreeSet<&str> = collection
        .iter()
        .flat_map(|f| f.properties.keys().map(String::as_str))
        .filter(|k| !is_synthetic(k))
        .collect();

    let mut headers = Vec::with_capacity(keys.len() + 2);
    headers.push(FEATURE_ID_HEADER.to_string());
    headers.push(GEOMETRY_TYPE_HEADER.to_string());
    headers.extend(keys.iter().map(|k| k.to_string()));

    let rows = collection
        .iter()
        .enumerate()
        .map(|(index, feature)| {
            let mut row = Row::with_capacity(headers.len());
            row.insert(FEATURE_ID_HEADER.to_string(), (index + 1).to_string());
            row.insert(
                GEOMETRY_TYPE_HEADER.to_string(),
                feature.geometry_type().to_string(),
            );
            for key in &keys {
                let value = feature
                    .properties
                    .get(*key)
                    .map(display_value)
                    .unwrap_or_default();
                row.insert(key.to_string(), value);
            }
            row
        })
        .collect();

    Table::new(headers, rows)
}

/// Projects an arbitrary JSON document.
///
/// Anything that is not a `{features: [...]}` object yields an empty table.
pub fn project_value(value: &Value) -> Table {
    match FeatureCollection::from_value(value) {
        Some(collection) => project(&collection),
        None => {
            debug!("Document is not a feature collection, projecting empty table");
            Table::default()
        }
    }
}

fn is_synthetic(key: &str) -> bool {
    key == FEATURE_ID_HEADER || key == GEOMETRY_TYPE_HEADER
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collection() -> FeatureCollection {
        FeatureCollection::from_value(&json!({
            "features": [
                {
                    "geometry": {"type": "Point", "coordinates": [-74.0, 40.7]},
                    "properties": {"name": "Blue Bottle", "rating": 4.5}
                },
                {
                    "geometry": null,
                    "properties": {"name": "Joe", "hours": {"open": 7, "close": 19}, "wifi": true}
                },
                {
                    "geometry": {"type": "Point", "coordinates": [-74.01, 40.71]},
                    "properties": {"name": null}
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_headers_and_row_count() {
        let collection = collection();
        let table = project(&collection);

        assert_eq!(
            table.headers,
            vec!["Feature ID", "Geometry Type", "hours", "name", "rating", "wifi"]
        );
        assert_eq!(table.rows.len(), collection.len());
    }

    #[test]
    fn test_cell_values() {
        let table = project(&collection());

        assert_eq!(table.cell(0, FEATURE_ID_HEADER), Some("1"));
        assert_eq!(table.cell(2, FEATURE_ID_HEADER), Some("3"));
        assert_eq!(table.cell(1, GEOMETRY_TYPE_HEADER), Some("Unknown"));
        assert_eq!(table.cell(0, "rating"), Some("4.5"));
        assert_eq!(table.cell(0, "wifi"), Some(""));
        let hours = table.cell(1, "hours").unwrap();
        assert!(hours.starts_with('{') && hours.contains(r#""open":7"#) && hours.contains(r#""close":19"#));
        assert_eq!(table.cell(1, "wifi"), Some("true"));
        assert_eq!(table.cell(2, "name"), Some(""));
    }

    #[test]
    fn test_headers_are_stable() {
        let collection = collection();
        assert_eq!(project(&collection).headers, project(&collection).headers);
    }

    #[test]
    fn test_empty_and_malformed_inputs() {
        assert_eq!(project(&FeatureCollection::default()), Table::default());
        assert_eq!(project_value(&json!({"features": "nope"})), Table::default());
        assert_eq!(project_value(&json!(null)), Table::default());
        assert_eq!(project_value(&json!({"features": []})), Table::default());
    }

    #[test]
    fn test_synthetic_keys_win() {
        let collection = FeatureCollection::from_value(&json!({
            "features": [{"geometry": null, "properties": {"Feature ID": "abc", "x": 1}}]
        }))
        .unwrap();
        let table = project(&collection);
        assert_eq!(table.headers, vec!["Feature ID", "Geometry Type", "x"]);
        assert_eq!(table.cell(0, FEATURE_ID_HEADER), Some("1"));
    }
}
