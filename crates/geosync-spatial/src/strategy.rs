//! Per-category matching and centering rules.

use geosync_core::config::{CenteringConfig, CenteringProfile};
use geosync_core::types::{Category, Feature};
use geosync_table::Row;

const POI_LABELS: &[&str] = &["name", "Name", "title"];
const FOOT_TRAFFIC_LABELS: &[&str] = &["name", "Name", "location_name", "address"];
const TRANSIT_LABELS: &[&str] = &["station_name", "name", "Name", "stop_name"];
const AVAILABILITY_LABELS: &[&str] = &["address", "Address", "name", "Name"];
const AVAILABILITY_KEYS: &[&str] = &["address", "neighborhood"];
const NO_KEYS: &[&str] = &[];

/// How rows of one category are matched to features and centered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryStrategy {
    pub category: Category,
    /// Row fields holding a display label, in priority order
    pub label_fields: &'static [&'static str],
    /// Fields that identify a feature together; empty when the category has
    /// no compound key
    pub compound_keys: &'static [&'static str],
    pub centering: CenteringProfile,
}

impl CategoryStrategy {
    /// Built-in strategy for a category.
    pub fn for_category(category: Category) -> Self {
        let (label_fields, compound_keys) = match category {
            Category::PointsOfInterest => (POI_LABELS, NO_KEYS),
            Category::FootTraffic => (FOOT_TRAFFIC_LABELS, NO_KEYS),
            Category::Transit => (TRANSIT_LABELS, NO_KEYS),
            Category::Availability => (AVAILABILITY_LABELS, AVAILABILITY_KEYS),
        };

        Self {
            category,
            label_fields,
            compound_keys,
            centering: CenteringProfile::default_for(category),
        }
    }

    /// First non-empty label of a row.
    pub fn row_label<'a>(&self, row: &'a Row) -> Option<&'a str> {
        self.label_fields
            .iter()
            .filter_map(|f| row.get(*f))
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
    }

    /// Marker description of a feature: its label values joined.
    pub fn describe(&self, feature: &Feature) -> String {
        let mut parts: Vec<String> = Vec::new();
        for field in self.label_fields {
            if let Some(value) = feature.property_display(field) {
                let value = value.trim().to_string();
                if !value.is_empty() && !parts.contains(&value) {
                    parts.push(value);
                }
            }
        }
        parts.join(" | ")
    }
}

/// Strategy per category, with centering profiles taken from configuration.
#[derive(Debug, Clone)]
pub struct StrategyTable {
    strategies: Vec<CategoryStrategy>,
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self::from_config(&CenteringConfig::default())
    }
}

impl StrategyTable {
    pub fn from_config(centering: &CenteringConfig) -> Self {
        let strategies = Category::ALL
            .iter()
            .map(|&category| CategoryStrategy {
                centering: centering.profile(category),
                ..CategoryStrategy::for_category(category)
            })
            .collect();
        Self { strategies }
    }

    pub fn get(&self, category: Category) -> &CategoryStrategy {
        &self.strategies[category.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geosync_core::types::LatLng;
    use serde_json::{json, Map};

    #[test]
    fn test_row_label_priority() {
        let strategy = CategoryStrategy::for_category(Category::Transit);
        let row: Row = [
            ("name".to_string(), "Fallback".to_string()),
            ("station_name".to_string(), "  ".to_string()),
        ]
        .into();
        assert_eq!(strategy.row_label(&row), Some("Fallback"));
        assert_eq!(strategy.row_label(&Row::new()), None);
    }

    #[test]
    fn test_describe_joins_distinct_labels() {
        let strategy = CategoryStrategy::for_category(Category::Availability);
        let mut properties = Map::new();
        properties.insert("address".to_string(), json!("12 Main St"));
        properties.insert("name".to_string(), json!("Corner Unit"));
        properties.insert("Name".to_string(), json!("Corner Unit"));
        let feature = Feature::point(LatLng::new(40.7, -74.0), properties);
        assert_eq!(strategy.describe(&feature), "12 Main St | Corner Unit");
    }

    #[test]
    fn test_table_uses_configured_centering() {
        let mut centering = CenteringConfig::default();
        centering
            .profiles
            .insert(Category::Transit, CenteringProfile::new(0.4, 15));
        let table = StrategyTable::from_config(&centering);

        assert_eq!(table.get(Category::Transit).centering, CenteringProfile::new(0.4, 15));
        assert_eq!(table.get(Category::Availability).centering.zoom, 17);
        assert_eq!(table.get(Category::Availability).compound_keys, &["address", "neighborhood"]);
        assert!(table.get(Category::PointsOfInterest).compound_keys.is_empty());
    }
}
