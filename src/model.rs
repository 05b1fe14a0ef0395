use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub revenue_index: Option<f64>,
    pub sell_through: Option<f64>,
    pub profitability: Option<f64>,
    pub margin: Option<f64>,
    pub rotation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFiles {
    pub report: String,
    pub detail_table: String,
    pub summary_table: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_entities: usize,
    pub summary_table_available: bool,
    pub primary_entity: String,
    pub primary: MetricSnapshot,
    pub competitors: BTreeMap<String, MetricSnapshot>,
    pub group_average: MetricSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub period: u32,
    pub year: i32,
    pub created_at: String,
    pub status: String,
    pub source_filename: String,
    pub source_sha256: String,
    pub files: RunFiles,
    pub summary: RunSummary,
    pub template_fallback_used: bool,
    #[serde(default)]
    pub warnings: Vec<String>,
}
