use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use std::time::Instant;
use tracing::info;

use hedge_lab_core::backtest::{
    period_analysis, performance_summary, rolling_metrics, run_backtest, BacktestRecord,
    BacktestResult, HedgeDirection, HedgeParameters, PerformanceMetrics, PerformanceSummary,
    PeriodMetrics,
};
use hedge_lab_core::config::AnalysisConfig;
use hedge_lab_core::export::export_csv;
use hedge_lab_core::hedge_ratio::{estimate, validate_hedge_ratio, EstimationWindow};
use hedge_lab_core::types::DateRange;

use super::{envelope, CommandResult};
use crate::input::prices::{parse_date_arg, parse_direction_arg, PriceArgs};

/// Hedge position flags shared by every command that runs a backtest.
#[derive(Args, Debug, Clone)]
pub struct StrategyArgs {
    #[command(flatten)]
    pub prices: PriceArgs,

    /// Hedge ratio; defaults to the estimated minimum-variance ratio
    #[arg(long)]
    pub ratio: Option<f64>,

    /// Estimation window used when --ratio is not given
    #[arg(long)]
    pub window: Option<usize>,

    /// Spot exposure in units
    #[arg(long)]
    pub spot_quantity: Option<f64>,

    /// short (inventory, sell futures) or long (procurement, buy futures)
    #[arg(long, value_parser = parse_direction_arg)]
    pub direction: Option<HedgeDirection>,

    /// Units per futures contract
    #[arg(long)]
    pub contract_size: Option<f64>,
}

/// A backtest ready for follow-up analysis.
pub struct PreparedBacktest {
    pub config: AnalysisConfig,
    pub result: BacktestResult,
    pub warnings: Vec<String>,
}

impl StrategyArgs {
    /// Load prices, resolve the hedge ratio and run the backtest.
    pub fn prepare(&self) -> Result<PreparedBacktest, Box<dyn std::error::Error>> {
        let mut config = self.prices.load_config()?;
        if self.window.is_some() {
            config.window = EstimationWindow::from_size(self.window);
        }
        if let Some(q) = self.spot_quantity {
            config.spot_quantity = q;
        }
        if let Some(direction) = self.direction {
            config.hedge_direction = direction;
        }
        if let Some(size) = self.contract_size {
            config.future_contract_size = size;
        }
        config.validate()?;

        let series = self.prices.load_series(config.missing_value_policy)?;
        let ratio = match self.ratio {
            Some(r) => r,
            None => {
                let est = estimate(&series, config.window)?;
                info!(ratio = est.optimal_hedge_ratio, "using estimated hedge ratio");
                est.optimal_hedge_ratio
            }
        };

        let mut warnings = Vec::new();
        let validation = validate_hedge_ratio(ratio);
        if !validation.is_valid {
            warnings.push(validation.message);
        }

        let result = run_backtest(&series, &config.backtest_parameters(ratio))?;
        Ok(PreparedBacktest {
            config,
            result,
            warnings,
        })
    }
}

pub fn strategy_assumptions(params: &HedgeParameters) -> serde_json::Value {
    serde_json::json!({
        "hedge_ratio": params.hedge_ratio,
        "spot_quantity": params.spot_quantity,
        "hedge_direction": params.hedge_direction,
        "future_contract_size": params.future_contract_size,
        "future_quantity": params.future_quantity,
    })
}

// ---------------------------------------------------------------------------
// backtest
// ---------------------------------------------------------------------------

/// Arguments for a hedged vs. unhedged backtest
#[derive(Args)]
pub struct BacktestArgs {
    #[command(flatten)]
    pub strategy: StrategyArgs,

    /// Include the daily records in the output
    #[arg(long)]
    pub records: bool,

    /// Write the daily records to this CSV file
    #[arg(long)]
    pub export: Option<String>,
}

#[derive(Serialize)]
struct BacktestOutput {
    parameters: HedgeParameters,
    metrics: PerformanceMetrics,
    summary: PerformanceSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    records: Option<Vec<BacktestRecord>>,
}

pub fn run_backtest_cmd(args: BacktestArgs) -> CommandResult {
    let started = Instant::now();
    let prepared = args.strategy.prepare()?;

    if let Some(path) = &args.export {
        export_csv(&prepared.result.records, path)?;
    }

    let summary = performance_summary(&prepared.result);
    let assumptions = strategy_assumptions(&prepared.result.parameters);
    let BacktestResult {
        records,
        metrics,
        parameters,
    } = prepared.result;

    envelope(
        "Daily hedged vs. unhedged P&L simulation",
        &assumptions,
        prepared.warnings,
        started,
        BacktestOutput {
            parameters,
            metrics,
            summary,
            records: args.records.then_some(records),
        },
    )
}

// ---------------------------------------------------------------------------
// period
// ---------------------------------------------------------------------------

/// Arguments for metrics over a date sub-range of a backtest
#[derive(Args)]
pub struct PeriodArgs {
    #[command(flatten)]
    pub strategy: StrategyArgs,

    /// First date of the period (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date_arg)]
    pub start: NaiveDate,

    /// Last date of the period (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date_arg)]
    pub end: NaiveDate,
}

#[derive(Serialize)]
struct PeriodOutput {
    range: DateRange,
    metrics: PeriodMetrics,
}

pub fn run_period(args: PeriodArgs) -> CommandResult {
    let started = Instant::now();
    let prepared = args.strategy.prepare()?;
    let analysis = period_analysis(&prepared.result, args.start, args.end)?;

    envelope(
        "Backtest metrics restricted to an inclusive date range",
        &strategy_assumptions(&prepared.result.parameters),
        prepared.warnings,
        started,
        PeriodOutput {
            range: analysis.range,
            metrics: analysis.metrics,
        },
    )
}

// ---------------------------------------------------------------------------
// rolling
// ---------------------------------------------------------------------------

/// Arguments for trailing-window backtest statistics
#[derive(Args)]
pub struct RollingArgs {
    #[command(flatten)]
    pub strategy: StrategyArgs,

    /// Trailing window length in trading days
    #[arg(long)]
    pub rolling_window: Option<usize>,
}

pub fn run_rolling(args: RollingArgs) -> CommandResult {
    let started = Instant::now();
    let prepared = args.strategy.prepare()?;
    let window = args.rolling_window.unwrap_or(prepared.config.rolling_window);
    let rows = rolling_metrics(&prepared.result, window)?;

    let mut warnings = prepared.warnings;
    if window > prepared.result.records.len() {
        warnings.push(format!(
            "rolling window {} exceeds the {} backtest days; every row is empty",
            window,
            prepared.result.records.len()
        ));
    }

    envelope(
        "Trailing-window volatility, mean/volatility ratio and change correlation",
        &serde_json::json!({ "rolling_window": window }),
        warnings,
        started,
        rows,
    )
}
