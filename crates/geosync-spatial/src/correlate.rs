//! Table row → map feature correlation.
//!
//! A row is resolved by trying, in order:
//!
//! 1. marker identity: the row label is a case-insensitive substring of a
//!    rendered marker's description;
//! 2. coordinate fields on the row (see [`crate::coords`]);
//! 3. compound key match against the source features, for categories that
//!    declare key fields;
//! 4. the positional `Feature ID` against the source features.
//!
//! The first success wins. Substring matching is best-effort: when several
//! markers contain the label, the first one in render order is used and no
//! confidence score is computed.

use crate::coords;
use crate::strategy::{CategoryStrategy, StrategyTable};
use geosync_core::types::{Category, FeatureCollection, LatLng, MarkerId};
use geosync_table::{Row, FEATURE_ID_HEADER};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// A rendered marker with its searchable description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerInfo {
    pub id: MarkerId,
    pub description: String,
    pub position: LatLng,
}

impl MarkerInfo {
    pub fn new(id: MarkerId, description: impl Into<String>, position: LatLng) -> Self {
        Self {
            id,
            description: description.into(),
            position,
        }
    }
}

/// Where a row resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// An already rendered marker
    Marker { marker_id: MarkerId, position: LatLng },
    /// Coordinates read from the row itself
    Coordinate(LatLng),
    /// A source feature
    Feature { index: usize, position: LatLng },
}

impl Resolution {
    pub fn position(&self) -> LatLng {
        match *self {
            Resolution::Marker { position, .. } => position,
            Resolution::Coordinate(position) => position,
            Resolution::Feature { position, .. } => position,
        }
    }
}

/// Data a row is resolved against.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationContext<'a> {
    /// Markers rendered for the row's category, in render order
    pub markers: &'a [MarkerInfo],
    /// Source features the table was projected from
    pub features: &'a FeatureCollection,
}

/// Resolves rows using the per-category strategy table.
#[derive(Debug, Clone, Default)]
pub struct Correlator {
    strategies: StrategyTable,
}

impl Correlator {
    pub fn new(strategies: StrategyTable) -> Self {
        Self { strategies }
    }

    pub fn strategies(&self) -> &StrategyTable {
        &self.strategies
    }

    /// Resolves a row; `None` means the row cannot be highlighted.
    pub fn resolve(
        &self,
        row: &Row,
        category: Category,
        ctx: &CorrelationContext<'_>,
    ) -> Option<Resolution> {
        let strategy = self.strategies.get(category);

        let resolution = by_marker(strategy, row, ctx.markers)
            .or_else(|| coords::parse_row(row).map(Resolution::Coordinate))
            .or_else(|| by_compound_key(strategy, row, ctx.features))
            .or_else(|| by_feature_id(row, ctx.features));

        trace!(category = %category, ?resolution, "Row correlation");
        resolution
    }
}

fn by_marker(strategy: &CategoryStrategy, row: &Row, markers: &[MarkerInfo]) -> Option<Resolution> {
    let label = strategy.row_label(row)?.to_lowercase();
    markers
        .iter()
        .find(|m| m.description.to_lowercase().contains(&label))
        .map(|m| Resolution::Marker {
            marker_id: m.id,
            position: m.position,
        })
}

fn by_compound_key(
    strategy: &CategoryStrategy,
    row: &Row,
    features: &FeatureCollection,
) -> Option<Resolution> {
    if strategy.compound_keys.is_empty() {
        return None;
    }

    let wanted: Vec<(&str, &str)> = strategy
        .compound_keys
        .iter()
        .map(|key| row.get(*key).map(|v| (*key, v.as_str())))
        .collect::<Option<_>>()?;

    features.iter().enumerate().find_map(|(index, feature)| {
        let matches = wanted
            .iter()
            .all(|(key, value)| feature.property_display(key).as_deref() == Some(*value));
        if !matches {
            return None;
        }
        feature
            .location()
            .map(|position| Resolution::Feature { index, position })
    })
}

fn by_feature_id(row: &Row, features: &FeatureCollection) -> Option<Resolution> {
    let id: usize = row.get(FEATURE_ID_HEADER)?.trim().parse().ok()?;
    let index = id.checked_sub(1)?;
    let position = features.features.get(index)?.location()?;
    Some(Resolution::Feature { index, position })
}
