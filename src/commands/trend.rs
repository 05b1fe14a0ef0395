use std::io::{self, Write};

use anyhow::Result;
use tracing::info;

use crate::cli::{TrendArgs, TrendMetric};
use crate::model::MetricSnapshot;
use crate::report::analyze::fmt_value;
use crate::report::{list_manifests, metric_trend};

fn metric_value(metric: TrendMetric, snapshot: &MetricSnapshot) -> Option<f64> {
    match metric {
        TrendMetric::RevenueIndex => snapshot.revenue_index,
        TrendMetric::SellThrough => snapshot.sell_through,
        TrendMetric::Profitability => snapshot.profitability,
        TrendMetric::Margin => snapshot.margin,
        TrendMetric::Rotation => snapshot.rotation,
    }
}

pub fn run(args: TrendArgs) -> Result<()> {
    let manifests = list_manifests(&args.cache_root)?;
    let points = metric_trend(&manifests, &args.entity, |snapshot| {
        metric_value(args.metric, snapshot)
    });
    info!(
        entity = %args.entity,
        metric = args.metric.as_str(),
        runs = points.len(),
        "computed trend"
    );

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "run_id\t{}\tgroup_average", args.metric.as_str())?;
    for point in &points {
        writeln!(
            output,
            "{}\t{}\t{}",
            point.run_id,
            fmt_value(point.value, 2),
            fmt_value(point.group_average, 2),
        )?;
    }
    output.flush()?;

    Ok(())
}
