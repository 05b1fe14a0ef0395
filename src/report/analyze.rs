use std::fmt::Write;

use anyhow::Result;

use crate::config::Thresholds;

use super::normalize::mean;
use super::tables::EntityMetrics;

const TOP_LIMIT: usize = 10;
const BUCKET_LIMIT: usize = 5;

const NICHE_MAX_SHARE: f64 = 1.0;

const PROFIT_ENGINE_MIN_MARGIN: f64 = 55.0;
const PROFIT_ENGINE_MIN_PROFITABILITY: f64 = 500.0;
const EXIT_MAX_ROTATION: f64 = 2.5;
const EXIT_MAX_REVENUE_INDEX: f64 = 1.0;

const SELL_THROUGH_LEADER: f64 = 45.0;
const SELL_THROUGH_LAGGARD: f64 = 30.0;

const RISK_SLOW_ROTATION: f64 = 2.5;
const RISK_LOW_SELL_THROUGH: f64 = 30.0;
const SAFE_ROTATION: f64 = 4.0;
const SAFE_SELL_THROUGH: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lens {
    Volume,
    Niche,
    HighMargin,
    LowMargin,
    Clustering,
    SellThroughTrend,
    InventoryRisk,
    TopRevenue,
    TopProfitability,
    TopRotation,
}

pub const TABLE_LENSES: [Lens; 10] = [
    Lens::Volume,
    Lens::Niche,
    Lens::HighMargin,
    Lens::LowMargin,
    Lens::Clustering,
    Lens::SellThroughTrend,
    Lens::InventoryRisk,
    Lens::TopRevenue,
    Lens::TopProfitability,
    Lens::TopRotation,
];

impl Lens {
    pub fn key(self) -> &'static str {
        match self {
            Self::Volume => "volume",
            Self::Niche => "niche",
            Self::HighMargin => "high-margin",
            Self::LowMargin => "low-margin",
            Self::Clustering => "clustering",
            Self::SellThroughTrend => "sell-through-trend",
            Self::InventoryRisk => "inventory-risk",
            Self::TopRevenue => "top-revenue",
            Self::TopProfitability => "top-profitability",
            Self::TopRotation => "top-rotation",
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            Self::Volume => "analysis_volume",
            Self::Niche => "analysis_niche",
            Self::HighMargin => "analysis_high_margin",
            Self::LowMargin => "analysis_low_margin",
            Self::Clustering => "analysis_clustering",
            Self::SellThroughTrend => "analysis_sell_through_trend",
            Self::InventoryRisk => "analysis_inventory_risk",
            Self::TopRevenue => "top10_revenue",
            Self::TopProfitability => "top10_profitability",
            Self::TopRotation => "top10_rotation",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Volume => "Volume brands analysis",
            Self::Niche => "Niche brands analysis",
            Self::HighMargin => "High margin analysis",
            Self::LowMargin => "Low margin analysis",
            Self::Clustering => "Brand clustering analysis",
            Self::SellThroughTrend => "Sell-through trend analysis",
            Self::InventoryRisk => "Inventory risk analysis",
            Self::TopRevenue => "Top 10 revenue index",
            Self::TopProfitability => "Top 10 profitability",
            Self::TopRotation => "Top 10 stock rotation",
        }
    }
}

pub fn run_lens(lens: Lens, table: &[EntityMetrics], thresholds: &Thresholds) -> String {
    if table.is_empty() {
        return format!("{}: no data found in the detail table.", lens.label());
    }

    let outcome = match lens {
        Lens::Volume => volume_leaders(table, thresholds),
        Lens::Niche => niche_leaders(table, thresholds),
        Lens::HighMargin => high_margin(table, thresholds),
        Lens::LowMargin => low_margin(table, thresholds),
        Lens::Clustering => clustering(table),
        Lens::SellThroughTrend => sell_through_trend(table),
        Lens::InventoryRisk => inventory_risk(table),
        Lens::TopRevenue => top_ten(table, |row| row.revenue_index),
        Lens::TopProfitability => top_ten(table, |row| row.profitability),
        Lens::TopRotation => top_ten(table, |row| row.rotation),
    };

    match outcome {
        Ok(text) => text.trim().to_string(),
        Err(error) => format!(
            "{}: data not fully available. Error: {:#}",
            lens.label(),
            error
        ),
    }
}

type MetricOf = fn(&EntityMetrics) -> Option<f64>;

fn ranked<'a>(
    table: &'a [EntityMetrics],
    metric: MetricOf,
    keep: impl Fn(&EntityMetrics) -> bool,
    descending: bool,
    limit: usize,
) -> Vec<(&'a EntityMetrics, f64)> {
    let mut rows = table
        .iter()
        .filter(|row| keep(row))
        .filter_map(|row| metric(row).map(|value| (row, value)))
        .collect::<Vec<(&EntityMetrics, f64)>>();

    rows.sort_by(|left, right| {
        let ordering = left.1.total_cmp(&right.1);
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
    rows.truncate(limit);
    rows
}

fn first_matching<'a>(
    table: &'a [EntityMetrics],
    keep: impl Fn(&EntityMetrics) -> bool,
    limit: usize,
) -> Vec<&'a EntityMetrics> {
    table.iter().filter(|row| keep(row)).take(limit).collect()
}

fn above(value: Option<f64>, cutoff: f64) -> bool {
    value.map(|value| value > cutoff).unwrap_or(false)
}

fn below(value: Option<f64>, cutoff: f64) -> bool {
    value.map(|value| value < cutoff).unwrap_or(false)
}

pub fn fmt_value(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(value) => format!("{value:.decimals$}"),
        None => "N/A".to_string(),
    }
}

pub fn fmt_percent(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(value) => format!("{value:.decimals$}%"),
        None => "N/A".to_string(),
    }
}

fn volume_leaders(table: &[EntityMetrics], thresholds: &Thresholds) -> Result<String> {
    let cutoff = thresholds.high_volume_share;
    let leaders = ranked(
        table,
        |row| row.share,
        |row| above(row.share, cutoff),
        true,
        TOP_LIMIT,
    );

    if leaders.is_empty() {
        return Ok(format!(
            "Volume brands: no brands with share > {cutoff}% found in the data."
        ));
    }

    let mut text = format!("Volume brands (share > {cutoff}%):\n\n");
    for (row, share) in leaders {
        writeln!(
            text,
            "• {}: {:.1}% share, rotation: {}, margin: {}",
            row.name,
            share,
            fmt_value(row.rotation, 2),
            fmt_percent(row.margin, 2)
        )?;
    }
    text.push_str("\nThese brands carry the revenue base and keep volumes stable.");
    Ok(text)
}

fn niche_leaders(table: &[EntityMetrics], thresholds: &Thresholds) -> Result<String> {
    let cutoff = thresholds.high_margin;
    let niche = ranked(
        table,
        |row| row.margin,
        |row| below(row.share, NICHE_MAX_SHARE) && above(row.margin, cutoff),
        true,
        TOP_LIMIT,
    );

    if niche.is_empty() {
        return Ok(format!(
            "Niche brands: no brands with low share (< {NICHE_MAX_SHARE}%) and high margin (> {cutoff}%) found."
        ));
    }

    let mut text =
        format!("Niche brands (share < {NICHE_MAX_SHARE}%, margin > {cutoff}%):\n\n");
    for (row, margin) in niche {
        writeln!(
            text,
            "• {}: {} share, margin: {:.2}%",
            row.name,
            fmt_percent(row.share, 1),
            margin
        )?;
    }
    text.push_str("\nThese brands deliver strong margins despite smaller volumes.");
    Ok(text)
}

fn high_margin(table: &[EntityMetrics], thresholds: &Thresholds) -> Result<String> {
    let cutoff = thresholds.high_margin;
    let brands = ranked(
        table,
        |row| row.margin,
        |row| above(row.margin, cutoff),
        true,
        TOP_LIMIT,
    );

    if brands.is_empty() {
        return Ok(format!(
            "High margin: no brands with margin > {cutoff}% found."
        ));
    }

    let mut text = format!("Brands with high margins (> {cutoff}%):\n\n");
    for (row, margin) in brands {
        writeln!(
            text,
            "• {}: {:.2}% margin, profitability: {}, rotation: {}",
            row.name,
            margin,
            fmt_value(row.profitability, 2),
            fmt_value(row.rotation, 2)
        )?;
    }
    text.push_str("\n→ These brands are profitable and strategically important for the total margin.");
    Ok(text)
}

fn low_margin(table: &[EntityMetrics], thresholds: &Thresholds) -> Result<String> {
    let cutoff = thresholds.low_margin;
    let brands = ranked(
        table,
        |row| row.margin,
        |row| below(row.margin, cutoff),
        false,
        TOP_LIMIT,
    );

    if brands.is_empty() {
        return Ok(format!(
            "Low margin: no brands with margin < {cutoff}% found (good news!)."
        ));
    }

    let mut text = format!("Brands with low margins (< {cutoff}%):\n\n");
    for (row, margin) in brands {
        writeln!(
            text,
            "• {}: {:.2}% margin, rotation: {}, share: {}",
            row.name,
            margin,
            fmt_value(row.rotation, 2),
            fmt_percent(row.share, 1)
        )?;
    }
    text.push_str("\n→ Watch out: these brands may bring volume but press on profitability.");
    Ok(text)
}

fn clustering(table: &[EntityMetrics]) -> Result<String> {
    let engines = first_matching(
        table,
        |row| {
            above(row.margin, PROFIT_ENGINE_MIN_MARGIN)
                && above(row.profitability, PROFIT_ENGINE_MIN_PROFITABILITY)
        },
        BUCKET_LIMIT,
    );
    let exits = first_matching(
        table,
        |row| {
            below(row.rotation, EXIT_MAX_ROTATION)
                && below(row.revenue_index, EXIT_MAX_REVENUE_INDEX)
        },
        BUCKET_LIMIT,
    );

    let mut text = String::from("Brand clustering:\n\n");
    writeln!(text, "PROFIT ENGINES (high margin + high profitability):")?;
    write_name_bucket(&mut text, &engines)?;
    writeln!(text, "\nEXIT CANDIDATES (slow rotation + low revenue):")?;
    write_name_bucket(&mut text, &exits)?;
    Ok(text)
}

fn write_name_bucket(text: &mut String, rows: &[&EntityMetrics]) -> Result<()> {
    if rows.is_empty() {
        writeln!(text, "  No brands found in this category")?;
    }
    for row in rows {
        writeln!(text, "  • {}", row.name)?;
    }
    Ok(())
}

fn sell_through_trend(table: &[EntityMetrics]) -> Result<String> {
    let average = mean(table.iter().map(|row| row.sell_through));

    let mut text = String::from("Sell-through trend analysis:\n\n");
    writeln!(text, "Average sell-through: {}\n", fmt_percent(average, 1))?;

    let leaders = ranked(
        table,
        |row| row.sell_through,
        |row| above(row.sell_through, SELL_THROUGH_LEADER),
        true,
        BUCKET_LIMIT,
    );
    writeln!(text, "LEADERS (> {SELL_THROUGH_LEADER}% sell-through):")?;
    if leaders.is_empty() {
        writeln!(text, "  No brands above {SELL_THROUGH_LEADER}% sell-through")?;
    }
    for (row, sell_through) in &leaders {
        writeln!(
            text,
            "  • {}: {:.1}% - {} rotation",
            row.name,
            sell_through,
            fmt_value(row.rotation, 2)
        )?;
    }

    let laggards = ranked(
        table,
        |row| row.sell_through,
        |row| below(row.sell_through, SELL_THROUGH_LAGGARD),
        false,
        BUCKET_LIMIT,
    );
    writeln!(text, "\nLAGGARDS (< {SELL_THROUGH_LAGGARD}% sell-through):")?;
    if laggards.is_empty() {
        writeln!(text, "  No brands below {SELL_THROUGH_LAGGARD}% sell-through")?;
    }
    for (row, sell_through) in &laggards {
        writeln!(
            text,
            "  • {}: {:.1}% - {} rotation",
            row.name,
            sell_through,
            fmt_value(row.rotation, 2)
        )?;
    }

    writeln!(text, "\nADVICE:")?;
    writeln!(
        text,
        "• Brands below {SELL_THROUGH_LAGGARD}% sell-through: review pricing and promotions"
    )?;
    writeln!(
        text,
        "• Brands above {SELL_THROUGH_LEADER}% sell-through: secure enough stock for the rest of the season"
    )?;
    Ok(text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RiskTier {
    High,
    Medium,
    Low,
}

fn risk_tier(row: &EntityMetrics) -> Option<RiskTier> {
    let rotation = row.rotation?;
    let sell_through = row.sell_through?;

    let slow = rotation < RISK_SLOW_ROTATION;
    let stuck = sell_through < RISK_LOW_SELL_THROUGH;

    if slow && stuck {
        Some(RiskTier::High)
    } else if slow != stuck {
        Some(RiskTier::Medium)
    } else if rotation > SAFE_ROTATION && sell_through > SAFE_SELL_THROUGH {
        Some(RiskTier::Low)
    } else {
        None
    }
}

fn inventory_risk(table: &[EntityMetrics]) -> Result<String> {
    let mut text = String::from("Inventory risk analysis (rotation + sell-through):\n\n");

    let sections = [
        (
            RiskTier::High,
            "HIGH RISK (slow rotation + low sell-through):",
            "  → Action: consider markdowns or returning stock to the supplier",
            "  No brands with high inventory risk identified",
        ),
        (
            RiskTier::Medium,
            "MEDIUM RISK:",
            "  → Action: monitor weekly and adjust where needed",
            "  No brands with medium risk",
        ),
        (
            RiskTier::Low,
            "LOW RISK (fast rotation + high sell-through):",
            "  → These brands perform excellently",
            "  Few brands with optimal stock rotation",
        ),
    ];

    for (index, (tier, heading, action, empty)) in sections.iter().enumerate() {
        if index > 0 {
            text.push('\n');
        }
        writeln!(text, "{heading}")?;

        let rows = first_matching(table, |row| risk_tier(row) == Some(*tier), BUCKET_LIMIT);
        if rows.is_empty() {
            writeln!(text, "{empty}")?;
            continue;
        }
        for row in rows {
            writeln!(
                text,
                "  • {}: rotation {}, sell-through {}",
                row.name,
                fmt_value(row.rotation, 2),
                fmt_percent(row.sell_through, 1)
            )?;
        }
        writeln!(text, "{action}")?;
    }

    Ok(text)
}

fn top_ten(table: &[EntityMetrics], metric: MetricOf) -> Result<String> {
    let rows = ranked(table, metric, |_| true, true, TOP_LIMIT);
    if rows.is_empty() {
        return Ok("No values available.".to_string());
    }

    let mut text = String::new();
    for (position, (row, value)) in rows.iter().enumerate() {
        writeln!(text, "{}. {} - {:.2}", position + 1, row.name, value)?;
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(name: &str) -> EntityMetrics {
        EntityMetrics {
            name: name.to_string(),
            ..EntityMetrics::default()
        }
    }

    fn with(
        name: &str,
        share: f64,
        margin: f64,
        sell_through: f64,
        rotation: f64,
    ) -> EntityMetrics {
        EntityMetrics {
            name: name.to_string(),
            revenue_index: Some(1.0),
            sell_through: Some(sell_through),
            profitability: Some(450.0),
            share: Some(share),
            margin: Some(margin),
            rotation: Some(rotation),
        }
    }

    fn bullet_names(text: &str) -> Vec<String> {
        text.lines()
            .filter_map(|line| line.trim().strip_prefix("• "))
            .map(|line| line.split(':').next().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn volume_lists_only_brands_above_share_cutoff() {
        let table = vec![
            with("BIG", 2.0, 60.0, 40.0, 3.0),
            with("SMALL A", 0.5, 50.0, 40.0, 3.0),
            with("SMALL B", 0.9, 58.0, 40.0, 3.0),
        ];

        let text = run_lens(Lens::Volume, &table, &Thresholds::default());
        assert_eq!(bullet_names(&text), vec!["BIG"]);
        assert!(text.contains("2.0% share"));
    }

    #[test]
    fn empty_table_reports_no_data_for_every_lens() {
        for lens in TABLE_LENSES {
            let text = run_lens(lens, &[], &Thresholds::default());
            assert!(text.contains("no data found"), "{}: {text}", lens.key());
        }
    }

    #[test]
    fn sentinel_rows_are_excluded_not_zeroed() {
        let mut missing_margin = entity("MISSING");
        missing_margin.share = Some(0.2);
        let table = vec![missing_margin, with("LOWM", 0.5, 40.0, 20.0, 2.0)];

        let text = run_lens(Lens::LowMargin, &table, &Thresholds::default());
        assert_eq!(bullet_names(&text), vec!["LOWM"]);
    }

    #[test]
    fn niche_requires_low_share_and_high_margin() {
        let table = vec![
            with("NICHE LOW", 0.4, 57.0, 40.0, 3.0),
            with("NICHE HIGH", 0.6, 62.0, 40.0, 3.0),
            with("BIG MARGIN", 1.5, 70.0, 40.0, 3.0),
            with("THIN", 0.3, 50.0, 40.0, 3.0),
        ];

        let text = run_lens(Lens::Niche, &table, &Thresholds::default());
        assert_eq!(bullet_names(&text), vec!["NICHE HIGH", "NICHE LOW"]);
    }

    #[test]
    fn low_margin_ranks_worst_first_and_honors_threshold() {
        let table = vec![
            with("A", 1.0, 47.0, 40.0, 3.0),
            with("B", 1.0, 30.0, 40.0, 3.0),
            with("C", 1.0, 45.0, 40.0, 3.0),
        ];

        let text = run_lens(Lens::LowMargin, &table, &Thresholds::default());
        assert_eq!(bullet_names(&text), vec!["B", "C", "A"]);

        let strict = Thresholds {
            low_margin: 46.0,
            ..Thresholds::default()
        };
        let text = run_lens(Lens::LowMargin, &table, &strict);
        assert_eq!(bullet_names(&text), vec!["B", "C"]);
    }

    #[test]
    fn high_margin_ties_keep_table_order() {
        let table = vec![
            with("FIRST", 1.0, 60.0, 40.0, 3.0),
            with("SECOND", 1.0, 60.0, 40.0, 3.0),
            with("TOP", 1.0, 65.0, 40.0, 3.0),
        ];

        let text = run_lens(Lens::HighMargin, &table, &Thresholds::default());
        assert_eq!(bullet_names(&text), vec!["TOP", "FIRST", "SECOND"]);
    }

    #[test]
    fn top_lists_are_capped_at_ten() {
        let table = (0..15)
            .map(|i| {
                let mut row = entity(&format!("B{i:02}"));
                row.revenue_index = Some(i as f64 / 10.0);
                row
            })
            .collect::<Vec<EntityMetrics>>();

        let text = run_lens(Lens::TopRevenue, &table, &Thresholds::default());
        let lines = text.lines().collect::<Vec<&str>>();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "1. B14 - 1.40");
        assert_eq!(lines[9], "10. B05 - 0.50");
    }

    #[test]
    fn clustering_buckets_and_empty_marker() {
        let mut engine = with("ENGINE", 1.0, 58.0, 40.0, 3.0);
        engine.profitability = Some(620.0);
        let mut exit = with("EXIT", 0.2, 45.0, 20.0, 1.8);
        exit.revenue_index = Some(0.7);

        let text = run_lens(Lens::Clustering, &[engine, exit], &Thresholds::default());
        let engines_at = text.find("PROFIT ENGINES").expect("engines heading");
        let exits_at = text.find("EXIT CANDIDATES").expect("exits heading");
        let engine_at = text.find("• ENGINE").expect("engine listed");
        let exit_at = text.find("• EXIT").expect("exit listed");
        assert!(engines_at < engine_at && engine_at < exits_at && exits_at < exit_at);

        let text = run_lens(
            Lens::Clustering,
            &[with("PLAIN", 1.0, 50.0, 40.0, 3.0)],
            &Thresholds::default(),
        );
        assert_eq!(text.matches("No brands found in this category").count(), 2);
    }

    #[test]
    fn sell_through_trend_reports_mean_and_buckets() {
        let table = vec![
            with("FAST", 1.0, 50.0, 50.0, 3.0),
            with("SLOW", 1.0, 50.0, 20.0, 3.0),
            with("MID", 1.0, 50.0, 35.0, 3.0),
            entity("UNKNOWN"),
        ];

        let text = run_lens(Lens::SellThroughTrend, &table, &Thresholds::default());
        assert!(text.contains("Average sell-through: 35.0%"));
        let leaders_at = text.find("LEADERS").expect("leaders");
        let laggards_at = text.find("LAGGARDS").expect("laggards");
        let fast_at = text.find("• FAST").expect("fast listed");
        let slow_at = text.find("• SLOW").expect("slow listed");
        assert!(leaders_at < fast_at && fast_at < laggards_at && laggards_at < slow_at);
        assert!(!text.contains("• MID"));
    }

    #[test]
    fn inventory_risk_tiers() {
        let table = vec![
            with("HIGH", 1.0, 50.0, 20.0, 2.0),
            with("MEDIUM SLOW", 1.0, 50.0, 35.0, 2.0),
            with("MEDIUM STUCK", 1.0, 50.0, 25.0, 3.0),
            with("LOW", 1.0, 50.0, 45.0, 4.5),
            with("NEUTRAL", 1.0, 50.0, 35.0, 3.5),
        ];

        assert_eq!(risk_tier(&table[0]), Some(RiskTier::High));
        assert_eq!(risk_tier(&table[1]), Some(RiskTier::Medium));
        assert_eq!(risk_tier(&table[2]), Some(RiskTier::Medium));
        assert_eq!(risk_tier(&table[3]), Some(RiskTier::Low));
        assert_eq!(risk_tier(&table[4]), None);
        assert_eq!(risk_tier(&entity("EMPTY")), None);

        let text = run_lens(Lens::InventoryRisk, &table, &Thresholds::default());
        assert!(text.contains("• HIGH: rotation 2.00, sell-through 20.0%"));
        assert!(!text.contains("NEUTRAL"));
    }
}
