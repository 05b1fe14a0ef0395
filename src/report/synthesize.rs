use std::collections::BTreeMap;
use std::fmt::Write;

use anyhow::{Result, bail};

use crate::model::MetricSnapshot;

use super::normalize::to_number;
use super::tables::SummaryRow;

const STRONG_REVENUE_GAP: f64 = 15.0;
const STRONG_SELL_THROUGH: f64 = 40.0;
const WEAK_SELL_THROUGH: f64 = 30.0;
const FAST_ROTATION: f64 = 4.0;
const CRITICAL_ROTATION: f64 = 2.0;

const RECOMMEND_SELL_THROUGH_BELOW: f64 = 35.0;
const RECOMMEND_ROTATION_BELOW: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverallTier {
    Strong,
    Acceptable,
    Mixed,
    Critical,
}

impl OverallTier {
    pub fn from_favorable(favorable: usize) -> Self {
        match favorable {
            4.. => Self::Strong,
            3 => Self::Acceptable,
            2 => Self::Mixed,
            _ => Self::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Inputs {
    revenue: (f64, f64),
    margin: (f64, f64),
    sell_through: (f64, f64),
    rotation: (f64, f64),
    profitability: (f64, f64),
}

impl Inputs {
    fn resolve(primary: &MetricSnapshot, group: &MetricSnapshot) -> Result<Self> {
        let pair = |label: &str, own: Option<f64>, avg: Option<f64>| -> Result<(f64, f64)> {
            match (own, avg) {
                (Some(own), Some(avg)) => Ok((own, avg)),
                (None, _) => bail!("{label} missing for the primary brand"),
                (_, None) => bail!("{label} group average missing"),
            }
        };

        let inputs = Self {
            revenue: pair("revenue index", primary.revenue_index, group.revenue_index)?,
            margin: pair("margin", primary.margin, group.margin)?,
            sell_through: pair("sell-through", primary.sell_through, group.sell_through)?,
            rotation: pair("stock rotation", primary.rotation, group.rotation)?,
            profitability: pair("profitability", primary.profitability, group.profitability)?,
        };

        for (label, (_, avg)) in [
            ("revenue index", inputs.revenue),
            ("stock rotation", inputs.rotation),
            ("profitability", inputs.profitability),
        ] {
            if avg == 0.0 {
                bail!("{label} group average is zero");
            }
        }

        Ok(inputs)
    }

    fn favorable(&self) -> usize {
        [
            self.revenue,
            self.margin,
            self.sell_through,
            self.rotation,
            self.profitability,
        ]
        .iter()
        .filter(|(own, avg)| own > avg)
        .count()
    }
}

fn relative_gap((own, avg): (f64, f64)) -> f64 {
    ((own / avg) - 1.0) * 100.0
}

pub fn synthesize_summary(
    primary_name: &str,
    primary: Option<&MetricSnapshot>,
    group: &MetricSnapshot,
    competitors: &BTreeMap<String, MetricSnapshot>,
    peer_group: &[String],
) -> String {
    let Some(primary) = primary else {
        return format!("SUMMARY: primary brand {primary_name} not found in the data.");
    };

    let inputs = match Inputs::resolve(primary, group) {
        Ok(inputs) => inputs,
        Err(error) => {
            return format!(
                "SUMMARY: insufficient data for a complete {primary_name} analysis. Error: {error}"
            );
        }
    };

    match render_summary(primary_name, &inputs, competitors, peer_group) {
        Ok(text) => text.trim().to_string(),
        Err(error) => format!(
            "SUMMARY: insufficient data for a complete {primary_name} analysis. Error: {error:#}"
        ),
    }
}

fn render_summary(
    name: &str,
    inputs: &Inputs,
    competitors: &BTreeMap<String, MetricSnapshot>,
    peer_group: &[String],
) -> Result<String> {
    let mut text = format!("SUMMARY - {name} performance period-to-date:\n\n");
    writeln!(text, "=== OVERALL PERFORMANCE ===\n")?;
    write_performance(&mut text, name, inputs)?;

    writeln!(text, "\n\n=== POSITION AGAINST DIRECT COMPETITORS ===\n")?;
    write_peer_ranking(&mut text, name, inputs.revenue.0, competitors, peer_group)?;

    writeln!(text, "\n\n=== STRATEGIC RECOMMENDATIONS ===\n")?;
    for recommendation in recommendations(inputs) {
        writeln!(text, "{recommendation}")?;
    }

    writeln!(text, "\n\n=== ACTION ITEMS FOR THE COMING PERIOD ===\n")?;
    writeln!(text, "[ ] Weekly review of sell-through % per collection segment")?;
    writeln!(text, "[ ] Discuss {name} performance in the team meeting")?;
    writeln!(text, "[ ] Compare in-store presentation with the best performing competitors")?;
    writeln!(text, "[ ] Check whether current stock levels match the sales pace")?;
    writeln!(text, "[ ] Plan next season's purchasing based on this period's insights")?;

    writeln!(text, "\n\n=== OVERALL CONCLUSION ===\n")?;
    let verdict = match OverallTier::from_favorable(inputs.favorable()) {
        OverallTier::Strong => format!(
            "[STRONG] {name} is a STRONG BRAND in the portfolio with healthy KPIs across the board.\nFocus on keeping and extending this position."
        ),
        OverallTier::Acceptable => format!(
            "[ACCEPTABLE] {name} performs ACCEPTABLY with more strengths than weaknesses.\nWith targeted improvements this brand can become a top performer."
        ),
        OverallTier::Mixed => format!(
            "[MIXED] {name} shows a MIXED PERFORMANCE with both opportunities and concerns.\nPrioritize the weak KPIs for improvement in the coming weeks."
        ),
        OverallTier::Critical => format!(
            "[CRITICAL] {name} UNDERPERFORMS on several fronts and needs IMMEDIATE ACTION.\nA strategic review of the brand is needed: reposition or phase out?"
        ),
    };
    writeln!(text, "{verdict}")?;

    Ok(text)
}

fn write_performance(text: &mut String, name: &str, inputs: &Inputs) -> Result<()> {
    let (revenue, revenue_avg) = inputs.revenue;
    let revenue_gap = relative_gap(inputs.revenue);
    if revenue > revenue_avg {
        writeln!(
            text,
            "[+] REVENUE: {name} performs {revenue_gap:.1}% ABOVE the group average"
        )?;
        writeln!(text, "  Index: {revenue:.2} vs. {revenue_avg:.2} (group)")?;
        if revenue_gap > STRONG_REVENUE_GAP {
            writeln!(text, "  → Excellent performance! {name} clearly pulls the assortment.")?;
        } else {
            writeln!(text, "  → Good performance, with room for further growth.")?;
        }
    } else {
        writeln!(
            text,
            "[-] REVENUE: {name} trails the group average by {:.1}%",
            revenue_gap.abs()
        )?;
        writeln!(text, "  Index: {revenue:.2} vs. {revenue_avg:.2} (group)")?;
        writeln!(
            text,
            "  → Action required: analyze why the brand underperforms and adjust the strategy."
        )?;
    }
    text.push('\n');

    let (margin, margin_avg) = inputs.margin;
    let margin_gap = margin - margin_avg;
    if margin > margin_avg {
        writeln!(
            text,
            "[+] MARGIN: {margin:.2}% - {margin_gap:.1}pp ABOVE the group average ({margin_avg:.2}%)"
        )?;
        writeln!(text, "  → Healthy profitability! {name} contributes strongly to the total margin.")?;
    } else {
        writeln!(
            text,
            "[-] MARGIN: {margin:.2}% - {:.1}pp BELOW the group average ({margin_avg:.2}%)",
            margin_gap.abs()
        )?;
        writeln!(text, "  → Focus on margin recovery: review purchasing and pricing.")?;
    }
    text.push('\n');

    let (sell_through, sell_through_avg) = inputs.sell_through;
    let sell_through_gap = sell_through - sell_through_avg;
    if sell_through > sell_through_avg {
        writeln!(
            text,
            "[+] SELL-THROUGH: {sell_through:.1}% - {sell_through_gap:.1}pp ABOVE average ({sell_through_avg:.1}%)"
        )?;
        if sell_through > STRONG_SELL_THROUGH {
            writeln!(text, "  → Strong sell-through! The assortment matches customer demand.")?;
        } else {
            writeln!(text, "  → Acceptable sell-through; keep monitoring towards season end.")?;
        }
    } else {
        writeln!(
            text,
            "[-] SELL-THROUGH: {sell_through:.1}% - {:.1}pp BELOW average ({sell_through_avg:.1}%)",
            sell_through_gap.abs()
        )?;
        if sell_through < WEAK_SELL_THROUGH {
            writeln!(text, "  → Worrying! Consider promotions to activate the stock.")?;
        } else {
            writeln!(text, "  → Below average but still acceptable. Monitor closely.")?;
        }
    }
    text.push('\n');

    let (rotation, rotation_avg) = inputs.rotation;
    let rotation_gap = relative_gap(inputs.rotation);
    if rotation > rotation_avg {
        writeln!(
            text,
            "[+] STOCK ROTATION: {rotation:.2} - {rotation_gap:.1}% FASTER than average ({rotation_avg:.2})"
        )?;
        if rotation > FAST_ROTATION {
            writeln!(text, "  → Excellent rotation! Stock sells quickly without overstock.")?;
        } else {
            writeln!(text, "  → Good rotation, stock moves through healthily.")?;
        }
    } else {
        writeln!(
            text,
            "[-] STOCK ROTATION: {rotation:.2} - {:.1}% SLOWER than average ({rotation_avg:.2})",
            rotation_gap.abs()
        )?;
        if rotation < CRITICAL_ROTATION {
            writeln!(text, "  → Critical! Stock sits too long. Risk of dead stock.")?;
        } else {
            writeln!(text, "  → Rotation can improve. Evaluate assortment and presentation.")?;
        }
    }
    text.push('\n');

    let (profitability, profitability_avg) = inputs.profitability;
    let profitability_gap = relative_gap(inputs.profitability);
    writeln!(
        text,
        "• PROFITABILITY: EUR {profitability:.2} per item (group: EUR {profitability_avg:.2})"
    )?;
    if profitability > profitability_avg {
        writeln!(
            text,
            "  → {profitability_gap:.1}% more profitable per item sold than average."
        )?;
    } else {
        writeln!(
            text,
            "  → {:.1}% less profitable per item. Focus on margin improvement.",
            profitability_gap.abs()
        )?;
    }

    Ok(())
}

/// Ranks the primary brand's revenue index among its peers. Ties keep input
/// order, with the primary brand listed after its peers.
pub fn peer_rank(primary_revenue: f64, peers: &[(String, f64)]) -> (usize, usize) {
    let mut standings = peers
        .iter()
        .map(|(_, revenue)| (false, *revenue))
        .collect::<Vec<(bool, f64)>>();
    standings.push((true, primary_revenue));
    standings.sort_by(|left, right| right.1.total_cmp(&left.1));

    let rank = standings
        .iter()
        .position(|(is_primary, _)| *is_primary)
        .map(|index| index + 1)
        .unwrap_or(standings.len());
    (rank, standings.len())
}

fn write_peer_ranking(
    text: &mut String,
    name: &str,
    primary_revenue: f64,
    competitors: &BTreeMap<String, MetricSnapshot>,
    peer_group: &[String],
) -> Result<()> {
    let mut peers = Vec::new();
    for peer in peer_group {
        if peer.eq_ignore_ascii_case(name) {
            continue;
        }
        let revenue = competitors
            .iter()
            .find(|(brand, _)| brand.eq_ignore_ascii_case(peer))
            .and_then(|(_, snapshot)| snapshot.revenue_index);
        match revenue {
            Some(revenue) => peers.push((peer.clone(), revenue)),
            None => {
                writeln!(text, "Competitor comparison: data not fully available ({peer} missing).")?;
                return Ok(());
            }
        }
    }

    if peers.is_empty() {
        writeln!(text, "Competitor comparison: no peer group configured.")?;
        return Ok(());
    }

    writeln!(text, "Revenue index comparison:")?;
    writeln!(text, "  • {name}: {primary_revenue:.2}")?;
    for (peer, revenue) in &peers {
        writeln!(text, "  • {peer}: {revenue:.2}")?;
    }

    let (rank, total) = peer_rank(primary_revenue, &peers);
    writeln!(text, "\n→ {name} ranks {rank} of {total} in this peer group.")?;
    match rank {
        1 => writeln!(text, "  Excellent! {name} is the strongest performer in the segment.")?,
        2 => writeln!(text, "  Strong position, with a benchmark to strive for.")?,
        _ => writeln!(text, "  Significant growth potential by learning from better performers.")?,
    }

    Ok(())
}

fn recommendations(inputs: &Inputs) -> Vec<&'static str> {
    let mut recommendations = Vec::new();

    if inputs.revenue.0 < inputs.revenue.1 {
        recommendations.push("[REVENUE] Increase floor visibility (prime locations, more facings)");
        recommendations.push("[REVENUE] Analyze which collection items perform and adjust purchasing");
    }
    if inputs.margin.0 < inputs.margin.1 {
        recommendations.push("[MARGIN] Renegotiate purchase prices with the supplier");
        recommendations.push("[MARGIN] Minimize discount actions; focus on full-price sales");
    }
    if inputs.sell_through.0 < RECOMMEND_SELL_THROUGH_BELOW {
        recommendations.push("[SELL-THROUGH] Start targeted promotions to stimulate sell-through");
        recommendations.push("[SELL-THROUGH] Cross-sell with better performing brands");
    }
    if inputs.rotation.0 < RECOMMEND_ROTATION_BELOW {
        recommendations.push("[STOCK] Critically review slow movers; consider returns or markdowns");
        recommendations.push("[STOCK] Reduce purchase volume next period until rotation > 3.0");
    }

    if recommendations.is_empty() {
        recommendations.push("[OK] Maintain course - performance is healthy");
        recommendations.push("[OK] Monitor weekly to keep this position");
        recommendations.push("[OK] Look for incremental improvements in the assortment mix");
    }

    recommendations
}

pub fn season_comparison(
    summary: Option<&SummaryRow>,
    primary_name: &str,
    primary: Option<&MetricSnapshot>,
) -> String {
    let unavailable = "Season comparison: historical comparison data not available. Current period figures are shown without comparison.".to_string();

    let (Some(summary), Some(primary)) = (summary, primary) else {
        return unavailable;
    };

    let group_revenue = to_number(summary.revenue_index_group.as_deref());
    let group_sell_through = to_number(summary.sell_through_group.as_deref());
    let group_margin = to_number(summary.margin_group.as_deref());

    let (
        Some(revenue),
        Some(sell_through),
        Some(margin),
        Some(group_revenue),
        Some(group_sell_through),
        Some(group_margin),
    ) = (
        primary.revenue_index,
        primary.sell_through,
        primary.margin,
        group_revenue,
        group_sell_through,
        group_margin,
    )
    else {
        return unavailable;
    };
    if group_revenue == 0.0 {
        return unavailable;
    }

    let revenue_gap = relative_gap((revenue, group_revenue));
    let conclusion = if revenue > group_revenue && margin > group_margin {
        format!("{primary_name} performs above the group average with good margins - continue the strategy.")
    } else if revenue > group_revenue {
        format!("{primary_name} has good revenue but margins can improve.")
    } else {
        format!("{primary_name} has growth potential - focus on revenue and margin improvement.")
    };

    format!(
        "Season comparison (year-on-year):\n\n\
         {primary_name} performance:\n\
         • Revenue index: {revenue:.2}\n\
         • Sell-through: {sell_through:.1}%\n\
         • Margin: {margin:.1}%\n\n\
         Total group performance:\n\
         • Revenue index: {group_revenue:.2} ({primary_name} is {revenue_gap:.1}% vs group)\n\
         • Sell-through: {group_sell_through:.1}% ({primary_name} is {:.1}pp vs group)\n\
         • Margin: {group_margin:.1}% ({primary_name} is {:.1}pp vs group)\n\n\
         CONCLUSION: {conclusion}",
        sell_through - group_sell_through,
        margin - group_margin,
    )
}
