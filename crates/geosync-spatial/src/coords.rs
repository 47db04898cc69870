//! Coordinate extraction from table rows.
//!
//! Rows carry coordinates under many field names. Each parser handles one
//! convention and returns `None` when its fields are missing or unparseable;
//! [`parse_row`] tries them in order and the first success wins.

use geosync_core::types::{Geometry, LatLng};
use geosync_table::Row;

/// A pure row → coordinate parser.
pub type CoordinateParser = fn(&Row) -> Option<LatLng>;

/// Parsers in priority order, with a name for logging.
pub const PARSERS: &[(&str, CoordinateParser)] = &[
    ("latitude_longitude", latitude_longitude),
    ("lat_lng", lat_lng),
    ("lat_lon", lat_lon),
    ("y_x", y_x),
    ("combined", combined),
    ("geometry", geometry),
];

const COMBINED_FIELDS: [&str; 3] = ["coordinates", "location", "latlng"];

/// Runs every parser in order and returns the first coordinate found.
pub fn parse_row(row: &Row) -> Option<LatLng> {
    PARSERS.iter().find_map(|(_, parser)| parser(row))
}

/// Looks a field up by exact name, then case-insensitively.
fn field<'a>(row: &'a Row, name: &str) -> Option<&'a str> {
    row.get(name)
        .or_else(|| {
            row.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn pair(row: &Row, lat_key: &str, lng_key: &str) -> Option<LatLng> {
    let lat = number(field(row, lat_key)?)?;
    let lng = number(field(row, lng_key)?)?;
    let position = LatLng::new(lat, lng);
    position.is_valid().then_some(position)
}

pub fn latitude_longitude(row: &Row) -> Option<LatLng> {
    pair(row, "latitude", "longitude")
}

pub fn lat_lng(row: &Row) -> Option<LatLng> {
    pair(row, "lat", "lng")
}

pub fn lat_lon(row: &Row) -> Option<LatLng> {
    pair(row, "lat", "lon")
}

pub fn y_x(row: &Row) -> Option<LatLng> {
    pair(row, "y", "x")
}

/// `"lat, lng"` in one field, optionally wrapped in brackets or parentheses.
pub fn combined(row: &Row) -> Option<LatLng> {
    COMBINED_FIELDS.iter().find_map(|name| {
        let value = field(row, name)?;
        let inner = value.trim_matches(|c: char| matches!(c, '[' | ']' | '(' | ')'));
        let (lat, lng) = inner.split_once(',')?;
        let position = LatLng::new(number(lat)?, number(lng)?);
        position.is_valid().then_some(position)
    })
}

/// Serialized GeoJSON geometry with Point coordinates `[lng, lat]`.
pub fn geometry(row: &Row) -> Option<LatLng> {
    let raw = field(row, "geometry")?;
    let geometry = Geometry::from_json_value(serde_json::from_str(raw).ok()?).ok()?;
    LatLng::from_geometry(&geometry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_named_pairs() {
        let expected = Some(LatLng::new(40.7, -74.0));
        assert_eq!(parse_row(&row(&[("latitude", "40.7"), ("longitude", "-74.0")])), expected);
        assert_eq!(parse_row(&row(&[("lat", "40.7"), ("lng", "-74.0")])), expected);
        assert_eq!(parse_row(&row(&[("lat", "40.7"), ("lon", "-74.0")])), expected);
        assert_eq!(parse_row(&row(&[("y", "40.7"), ("x", "-74.0")])), expected);
        assert_eq!(parse_row(&row(&[("Latitude", " 40.7 "), ("Longitude", "-74.0")])), expected);
    }

    #[test]
    fn test_combined_field() {
        assert_eq!(
            parse_row(&row(&[("location", "40.75, -73.99")])),
            Some(LatLng::new(40.75, -73.99))
        );
        assert_eq!(
            parse_row(&row(&[("coordinates", "[40.75,-73.99]")])),
            Some(LatLng::new(40.75, -73.99))
        );
        assert_eq!(parse_row(&row(&[("location", "Midtown")])), None);
    }

    #[test]
    fn test_geometry_string() {
        let r = row(&[("geometry", r#"{"type":"Point","coordinates":[-73.98,40.76]}"#)]);
        assert_eq!(parse_row(&r), Some(LatLng::new(40.76, -73.98)));

        let line = row(&[("geometry", r#"{"type":"LineString","coordinates":[[0,0],[1,1]]}"#)]);
        assert_eq!(parse_row(&line), None);
    }

    #[test]
    fn test_failing_parser_falls_through() {
        let r = row(&[
            ("latitude", "north"),
            ("longitude", "-74.0"),
            ("lat", "40.7"),
            ("lon", "-74.0"),
        ]);
        assert_eq!(parse_row(&r), Some(LatLng::new(40.7, -74.0)));
    }

    #[test]
    fn test_out_of_range_is_rejected() {
        assert_eq!(parse_row(&row(&[("lat", "140.7"), ("lng", "-74.0")])), None);
        assert_eq!(parse_row(&row(&[("lat", ""), ("lng", "")])), None);
        assert_eq!(parse_row(&Row::new()), None);
    }
}
