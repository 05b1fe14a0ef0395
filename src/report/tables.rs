use serde::{Deserialize, Serialize};

use super::normalize::to_number;

pub const SUMMARY_COLUMNS: [&str; 10] = [
    "revenue_index_own",
    "revenue_index_group",
    "sell_through_own",
    "sell_through_group",
    "profitability_own",
    "profitability_group",
    "margin_own",
    "margin_group",
    "rotation_own",
    "rotation_group",
];

pub const ENTITY_COLUMNS: [&str; 10] = [
    "name",
    "revenue_index_own",
    "revenue_index_group",
    "sell_through_own",
    "sell_through_group",
    "profitability_own",
    "profitability_group",
    "share_group",
    "margin_group",
    "rotation_group",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowShape {
    Complete,
    Short { present: usize, expected: usize },
    Overlong { present: usize, expected: usize },
}

impl RowShape {
    pub fn of(present: usize, expected: usize) -> Self {
        match present.cmp(&expected) {
            std::cmp::Ordering::Equal => Self::Complete,
            std::cmp::Ordering::Less => Self::Short { present, expected },
            std::cmp::Ordering::Greater => Self::Overlong { present, expected },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub revenue_index_own: Option<String>,
    pub revenue_index_group: Option<String>,
    pub sell_through_own: Option<String>,
    pub sell_through_group: Option<String>,
    pub profitability_own: Option<String>,
    pub profitability_group: Option<String>,
    pub margin_own: Option<String>,
    pub margin_group: Option<String>,
    pub rotation_own: Option<String>,
    pub rotation_group: Option<String>,
}

impl SummaryRow {
    pub fn from_cells(cells: &[String]) -> (Self, RowShape) {
        let cell = |index: usize| {
            cells
                .get(index)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        let row = Self {
            revenue_index_own: cell(0),
            revenue_index_group: cell(1),
            sell_through_own: cell(2),
            sell_through_group: cell(3),
            profitability_own: cell(4),
            profitability_group: cell(5),
            margin_own: cell(6),
            margin_group: cell(7),
            rotation_own: cell(8),
            rotation_group: cell(9),
        };
        (row, RowShape::of(cells.len(), SUMMARY_COLUMNS.len()))
    }

    pub fn to_cells(&self) -> Vec<Option<&str>> {
        vec![
            self.revenue_index_own.as_deref(),
            self.revenue_index_group.as_deref(),
            self.sell_through_own.as_deref(),
            self.sell_through_group.as_deref(),
            self.profitability_own.as_deref(),
            self.profitability_group.as_deref(),
            self.margin_own.as_deref(),
            self.margin_group.as_deref(),
            self.rotation_own.as_deref(),
            self.rotation_group.as_deref(),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.to_cells()
            .iter()
            .all(|cell| cell.map(|value| value.trim().is_empty()).unwrap_or(true))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub name: String,
    pub revenue_index_own: Option<String>,
    pub revenue_index_group: Option<String>,
    pub sell_through_own: Option<String>,
    pub sell_through_group: Option<String>,
    pub profitability_own: Option<String>,
    pub profitability_group: Option<String>,
    pub share_group: Option<String>,
    pub margin_group: Option<String>,
    pub rotation_group: Option<String>,
}

impl EntityRecord {
    pub fn from_cells(cells: &[String]) -> (Self, RowShape) {
        let cell = |index: usize| {
            cells
                .get(index)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        let record = Self {
            name: cells.first().map(|name| name.trim().to_string()).unwrap_or_default(),
            revenue_index_own: cell(1),
            revenue_index_group: cell(2),
            sell_through_own: cell(3),
            sell_through_group: cell(4),
            profitability_own: cell(5),
            profitability_group: cell(6),
            share_group: cell(7),
            margin_group: cell(8),
            rotation_group: cell(9),
        };
        (record, RowShape::of(cells.len(), ENTITY_COLUMNS.len()))
    }

    pub fn to_cells(&self) -> Vec<Option<&str>> {
        vec![
            Some(self.name.as_str()),
            self.revenue_index_own.as_deref(),
            self.revenue_index_group.as_deref(),
            self.sell_through_own.as_deref(),
            self.sell_through_group.as_deref(),
            self.profitability_own.as_deref(),
            self.profitability_group.as_deref(),
            self.share_group.as_deref(),
            self.margin_group.as_deref(),
            self.rotation_group.as_deref(),
        ]
    }

    pub fn metrics(&self) -> EntityMetrics {
        EntityMetrics {
            name: self.name.clone(),
            revenue_index: to_number(self.revenue_index_group.as_deref()),
            sell_through: to_number(self.sell_through_group.as_deref()),
            profitability: to_number(self.profitability_group.as_deref()),
            share: to_number(self.share_group.as_deref()),
            margin: to_number(self.margin_group.as_deref()),
            rotation: to_number(self.rotation_group.as_deref()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityMetrics {
    pub name: String,
    pub revenue_index: Option<f64>,
    pub sell_through: Option<f64>,
    pub profitability: Option<f64>,
    pub share: Option<f64>,
    pub margin: Option<f64>,
    pub rotation: Option<f64>,
}

pub fn normalize_entities(records: &[EntityRecord]) -> Vec<EntityMetrics> {
    records.iter().map(EntityRecord::metrics).collect()
}
