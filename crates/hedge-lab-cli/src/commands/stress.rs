use chrono::NaiveDate;
use clap::Args;
use std::fs::File;
use std::time::Instant;

use hedge_lab_core::config::AnalysisConfig;
use hedge_lab_core::stress::{run_stress_test, write_stress_csv, StressConfig, StressSelection};

use super::backtest::{strategy_assumptions, StrategyArgs};
use super::{envelope, CommandResult};
use crate::input::prices::parse_date_arg;

/// Detection thresholds and optional custom window, shared by `stress` and `report`.
#[derive(Args, Debug, Clone)]
pub struct StressArgs {
    /// Absolute daily spot move, in percent, that counts as extreme
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Shortest run of extreme days reported as a stress period
    #[arg(long)]
    pub min_days: Option<usize>,

    /// Start of a custom stress window (YYYY-MM-DD); needs --stress-end
    #[arg(long, value_parser = parse_date_arg, requires = "stress_end")]
    pub stress_start: Option<NaiveDate>,

    /// End of a custom stress window (YYYY-MM-DD); needs --stress-start
    #[arg(long, value_parser = parse_date_arg, requires = "stress_start")]
    pub stress_end: Option<NaiveDate>,
}

impl StressArgs {
    pub fn config(&self, config: &AnalysisConfig) -> Result<StressConfig, Box<dyn std::error::Error>> {
        let mut stress = config.stress;
        if let Some(t) = self.threshold {
            stress.price_change_threshold = t;
        }
        if let Some(days) = self.min_days {
            stress.min_consecutive_days = days;
        }
        stress.validate()?;
        Ok(stress)
    }

    pub fn selection(&self) -> StressSelection {
        match (self.stress_start, self.stress_end) {
            (Some(start), Some(end)) => StressSelection::Custom { start, end },
            _ => StressSelection::AutoDetect,
        }
    }
}

/// Arguments for a stress test of the hedge
#[derive(Args)]
pub struct StressTestArgs {
    #[command(flatten)]
    pub strategy: StrategyArgs,

    #[command(flatten)]
    pub stress: StressArgs,

    /// Write one row per tested period to this CSV file
    #[arg(long)]
    pub export: Option<String>,
}

pub fn run_stress(args: StressTestArgs) -> CommandResult {
    let started = Instant::now();
    let prepared = args.strategy.prepare()?;
    let stress_config = args.stress.config(&prepared.config)?;
    let result = run_stress_test(&prepared.result, &args.stress.selection(), &stress_config)?;

    if let Some(path) = &args.export {
        write_stress_csv(&result, File::create(path)?)?;
    }

    let mut warnings = prepared.warnings;
    if result.summary.is_none() {
        warnings.push(format!(
            "no stress periods found at {}% over {}+ days",
            stress_config.price_change_threshold, stress_config.min_consecutive_days
        ));
    }

    let mut assumptions = strategy_assumptions(&prepared.result.parameters);
    assumptions["stress"] = serde_json::to_value(stress_config)?;

    envelope(
        "Backtest re-scored on extreme-move periods against the calm remainder",
        &assumptions,
        warnings,
        started,
        result,
    )
}
