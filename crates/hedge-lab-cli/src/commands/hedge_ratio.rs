use clap::Args;
use serde::Serialize;
use std::time::Instant;

use hedge_lab_core::export::export_csv;
use hedge_lab_core::hedge_ratio::{
    effectiveness, estimate, hedge_quantity, sensitivity_table, validate_hedge_ratio,
    EstimationWindow, HedgeEffectiveness, HedgeQuantity, HedgeRatioEstimate, RatioValidation,
    SensitivityRow,
};

use super::{envelope, CommandResult};
use crate::input::prices::PriceArgs;

/// Arguments for minimum-variance hedge ratio estimation
#[derive(Args)]
pub struct HedgeRatioArgs {
    #[command(flatten)]
    pub prices: PriceArgs,

    /// Estimate on the N most recent rows only
    #[arg(long)]
    pub window: Option<usize>,

    /// Spot exposure to size the futures position for
    #[arg(long)]
    pub spot_quantity: Option<f64>,

    /// Units per futures contract
    #[arg(long)]
    pub contract_size: Option<f64>,
}

/// Arguments for a hedge ratio sensitivity sweep
#[derive(Args)]
pub struct SensitivityArgs {
    #[command(flatten)]
    pub prices: PriceArgs,

    /// Centre of the sweep; defaults to the estimated optimal ratio
    #[arg(long)]
    pub ratio: Option<f64>,

    /// Estimation window used when --ratio is not given
    #[arg(long)]
    pub window: Option<usize>,

    /// Relative half-width of the sweep (0.2 = ±20%)
    #[arg(long)]
    pub range: Option<f64>,

    /// Number of ratios evaluated
    #[arg(long)]
    pub steps: Option<usize>,

    /// Write the sweep to this CSV file
    #[arg(long)]
    pub export: Option<String>,
}

#[derive(Serialize)]
struct HedgeRatioOutput {
    estimate: HedgeRatioEstimate,
    effectiveness: HedgeEffectiveness,
    validation: RatioValidation,
    quantity: HedgeQuantity,
}

pub fn run_hedge_ratio(args: HedgeRatioArgs) -> CommandResult {
    let started = Instant::now();
    let mut config = args.prices.load_config()?;
    if args.window.is_some() {
        config.window = EstimationWindow::from_size(args.window);
    }
    if let Some(q) = args.spot_quantity {
        config.spot_quantity = q;
    }
    if let Some(size) = args.contract_size {
        config.future_contract_size = size;
    }
    config.validate()?;

    let series = args.prices.load_series(config.missing_value_policy)?;
    let est = estimate(&series, config.window)?;
    let eff = effectiveness(&series, est.optimal_hedge_ratio)?;
    let validation = validate_hedge_ratio(est.optimal_hedge_ratio);
    let quantity = hedge_quantity(
        config.spot_quantity,
        est.optimal_hedge_ratio,
        config.future_contract_size,
    )?;

    let mut warnings = Vec::new();
    if !validation.is_valid {
        warnings.push(validation.message.clone());
    }
    if est.diagnostics.slope_pvalue > 0.05 {
        warnings.push(format!(
            "slope is not significant at 5% (p = {:.4})",
            est.diagnostics.slope_pvalue
        ));
    }

    envelope(
        "Minimum-variance hedge ratio: Cov(ΔS, ΔF) / Var(ΔF) with OLS diagnostics",
        &serde_json::json!({
            "window": config.window,
            "spot_quantity": config.spot_quantity,
            "future_contract_size": config.future_contract_size,
        }),
        warnings,
        started,
        HedgeRatioOutput {
            estimate: est,
            effectiveness: eff,
            validation,
            quantity,
        },
    )
}

pub fn run_sensitivity(args: SensitivityArgs) -> CommandResult {
    let started = Instant::now();
    let mut config = args.prices.load_config()?;
    if args.window.is_some() {
        config.window = EstimationWindow::from_size(args.window);
    }
    if let Some(range) = args.range {
        config.sensitivity_range = range;
    }
    if let Some(steps) = args.steps {
        config.sensitivity_steps = steps;
    }
    config.validate()?;

    let series = args.prices.load_series(config.missing_value_policy)?;
    let base_ratio = match args.ratio {
        Some(r) => r,
        None => estimate(&series, config.window)?.optimal_hedge_ratio,
    };
    let rows: Vec<SensitivityRow> = sensitivity_table(
        &series,
        base_ratio,
        config.sensitivity_range,
        config.sensitivity_steps,
    )?;

    if let Some(path) = &args.export {
        export_csv(&rows, path)?;
    }

    let mut warnings = Vec::new();
    if base_ratio == 0.0 {
        warnings.push("base ratio is zero; ratio deviations are undefined".to_string());
    }

    envelope(
        "Hedge effectiveness over a linear sweep of hedge ratios",
        &serde_json::json!({
            "base_ratio": base_ratio,
            "range": config.sensitivity_range,
            "steps": config.sensitivity_steps,
        }),
        warnings,
        started,
        rows,
    )
}
