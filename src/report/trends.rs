use serde::Serialize;

use crate::model::{MetricSnapshot, RunManifest};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub run_id: String,
    pub period: u32,
    pub year: i32,
    pub value: Option<f64>,
    pub group_average: Option<f64>,
}

pub fn metric_trend(
    manifests: &[RunManifest],
    entity: &str,
    select: impl Fn(&MetricSnapshot) -> Option<f64>,
) -> Vec<TrendPoint> {
    let mut points = manifests
        .iter()
        .map(|manifest| TrendPoint {
            run_id: manifest.run_id.clone(),
            period: manifest.period,
            year: manifest.year,
            value: entity_snapshot(manifest, entity).and_then(&select),
            group_average: select(&manifest.summary.group_average),
        })
        .collect::<Vec<TrendPoint>>();

    points.sort_by_key(|point| (point.year, point.period));
    points
}

fn entity_snapshot<'a>(manifest: &'a RunManifest, entity: &str) -> Option<&'a MetricSnapshot> {
    let summary = &manifest.summary;
    if summary.primary_entity.eq_ignore_ascii_case(entity) {
        return Some(&summary.primary);
    }
    summary
        .competitors
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(entity))
        .map(|(_, snapshot)| snapshot)
}
