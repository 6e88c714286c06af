use clap::Args;
use serde::Serialize;
use std::fs;
use std::time::Instant;
use tracing::info;

use hedge_lab_core::report::{render_analysis_report, StressVerdict};
use hedge_lab_core::stress::run_stress_test;

use super::backtest::{strategy_assumptions, StrategyArgs};
use super::stress::StressArgs;
use super::{envelope, CommandResult};

/// Arguments for the Markdown analysis report
#[derive(Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub strategy: StrategyArgs,

    #[command(flatten)]
    pub stress: StressArgs,

    /// Leave the stress test section out
    #[arg(long)]
    pub no_stress: bool,

    /// Write the report to this Markdown file
    #[arg(long)]
    pub out: Option<String>,
}

#[derive(Serialize)]
struct ReportOutput {
    report: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stress_verdict: Option<StressVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

pub fn run_report(args: ReportArgs) -> CommandResult {
    let started = Instant::now();
    let prepared = args.strategy.prepare()?;

    let stress = if args.no_stress {
        None
    } else {
        let config = args.stress.config(&prepared.config)?;
        Some(run_stress_test(&prepared.result, &args.stress.selection(), &config)?)
    };
    let stress_verdict = stress
        .as_ref()
        .and_then(|s| s.summary.as_ref())
        .map(|s| StressVerdict::from_effectiveness(s.stress_effectiveness));

    let report = render_analysis_report(
        &prepared.result,
        stress.as_ref(),
        args.strategy.prices.symbol.as_deref(),
        chrono::Local::now().naive_local(),
    );

    if let Some(path) = &args.out {
        fs::write(path, &report)?;
        info!(path = %path, "report written");
    }

    envelope(
        "Markdown summary of the backtest and stress test",
        &strategy_assumptions(&prepared.result.parameters),
        prepared.warnings,
        started,
        ReportOutput {
            report,
            stress_verdict,
            path: args.out,
        },
    )
}
