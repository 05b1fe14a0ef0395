use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "brandreport",
    version,
    about = "Brand performance report generation from branch PDF tables"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Run(RunArgs),
    List(ListArgs),
    Show(ShowArgs),
    Delete(DeleteArgs),
    Trend(TrendArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(long, default_value = ".cache/brandreport")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub source: PathBuf,

    #[arg(long)]
    pub period: Option<u32>,

    #[arg(long)]
    pub year: Option<i32>,

    #[arg(long)]
    pub template: Option<PathBuf>,

    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[arg(long, default_value = ".cache/brandreport")]
    pub cache_root: PathBuf,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    #[arg(long, default_value = ".cache/brandreport")]
    pub cache_root: PathBuf,

    pub run_id: String,

    #[arg(long, default_value_t = false)]
    pub detail: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    #[arg(long, default_value = ".cache/brandreport")]
    pub cache_root: PathBuf,

    pub run_id: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum TrendMetric {
    RevenueIndex,
    SellThrough,
    Profitability,
    Margin,
    Rotation,
}

impl TrendMetric {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RevenueIndex => "revenue_index",
            Self::SellThrough => "sell_through",
            Self::Profitability => "profitability",
            Self::Margin => "margin",
            Self::Rotation => "rotation",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct TrendArgs {
    #[arg(long, default_value = ".cache/brandreport")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub entity: String,

    #[arg(long, value_enum, default_value_t = TrendMetric::RevenueIndex)]
    pub metric: TrendMetric,
}
