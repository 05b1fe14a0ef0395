use std::collections::BTreeMap;

use crate::model::MetricSnapshot;

use super::analyze::{fmt_percent, fmt_value};
use super::normalize::mean;
use super::tables::EntityMetrics;

impl MetricSnapshot {
    pub fn of(row: &EntityMetrics) -> Self {
        Self {
            revenue_index: row.revenue_index,
            sell_through: row.sell_through,
            profitability: row.profitability,
            margin: row.margin,
            rotation: row.rotation,
        }
    }

    pub fn display_values(&self) -> [(&'static str, String); 5] {
        [
            ("revenue_index", fmt_value(self.revenue_index, 2)),
            ("sell_through", fmt_percent(self.sell_through, 2)),
            ("profitability", fmt_value(self.profitability, 2)),
            ("margin", fmt_percent(self.margin, 2)),
            ("rotation", fmt_value(self.rotation, 2)),
        ]
    }
}

pub fn snapshot_for(table: &[EntityMetrics], name: &str) -> Option<MetricSnapshot> {
    let wanted = name.trim().to_uppercase();
    table
        .iter()
        .find(|row| row.name.trim().to_uppercase() == wanted)
        .map(MetricSnapshot::of)
}

pub fn group_average(table: &[EntityMetrics]) -> MetricSnapshot {
    MetricSnapshot {
        revenue_index: mean(table.iter().map(|row| row.revenue_index)),
        sell_through: mean(table.iter().map(|row| row.sell_through)),
        profitability: mean(table.iter().map(|row| row.profitability)),
        margin: mean(table.iter().map(|row| row.margin)),
        rotation: mean(table.iter().map(|row| row.rotation)),
    }
}

pub fn competitor_snapshots(
    table: &[EntityMetrics],
    brands: &[String],
) -> BTreeMap<String, MetricSnapshot> {
    brands
        .iter()
        .map(|brand| {
            (
                brand.clone(),
                snapshot_for(table, brand).unwrap_or_default(),
            )
        })
        .collect()
}

pub fn placeholder_key(name: &str) -> String {
    let mut key = String::new();
    for character in name.trim().to_lowercase().chars() {
        match character {
            '&' => {}
            character if character.is_whitespace() || character == '_' => {
                if !key.is_empty() && !key.ends_with('_') {
                    key.push('_');
                }
            }
            character => key.push(character),
        }
    }
    key.trim_end_matches('_').to_string()
}
