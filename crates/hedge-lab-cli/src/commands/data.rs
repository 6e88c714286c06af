use clap::Args;
use serde::Serialize;
use std::time::Instant;

use hedge_lab_core::data::{summarize, AlignedSeries, DataSummary};

use super::{envelope, CommandResult};
use crate::input::prices::PriceArgs;

/// Arguments for price loading and alignment
#[derive(Args)]
pub struct AlignArgs {
    #[command(flatten)]
    pub prices: PriceArgs,

    /// Print only the summary, without the aligned rows
    #[arg(long)]
    pub summary_only: bool,
}

#[derive(Serialize)]
struct AlignOutput {
    summary: DataSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    series: Option<AlignedSeries>,
}

pub fn run_align(args: AlignArgs) -> CommandResult {
    let started = Instant::now();
    let config = args.prices.load_config()?;
    let series = args.prices.load_series(config.missing_value_policy)?;
    let summary = summarize(&series);

    let mut warnings = Vec::new();
    if series.len() < 3 {
        warnings.push(format!(
            "only {} aligned rows; estimation needs at least 3",
            series.len()
        ));
    }

    envelope(
        "Inner join of spot and futures on date",
        &serde_json::json!({ "missing_value_policy": config.missing_value_policy }),
        warnings,
        started,
        AlignOutput {
            summary,
            series: (!args.summary_only).then_some(series),
        },
    )
}
