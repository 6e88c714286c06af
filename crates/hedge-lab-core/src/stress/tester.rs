use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use super::detector::{identify_stress_periods, StressConfig, StressPeriod, StressType};
use crate::backtest::{count_profitable, BacktestRecord, BacktestResult, VAR_PERCENTILE};
use crate::error::HedgeError;
use crate::stats;
use crate::types::{DateRange, Pnl, Rate};
use crate::HedgeResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What drives a stress test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressSelection {
    /// Score these previously detected periods.
    Periods(Vec<StressPeriod>),
    /// Score one explicit inclusive date range.
    Custom { start: NaiveDate, end: NaiveDate },
    /// Detect periods on the backtest's own price rows first.
    AutoDetect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressTestType {
    IdentifiedPeriods,
    CustomPeriod,
}

/// Category of a scored slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    SharpDecline,
    SharpRally,
    HighVolatility,
    Custom,
    Normal,
}

impl PeriodKind {
    pub fn label(self) -> &'static str {
        match self {
            PeriodKind::SharpDecline => StressType::SharpDecline.label(),
            PeriodKind::SharpRally => StressType::SharpRally.label(),
            PeriodKind::HighVolatility => StressType::HighVolatility.label(),
            PeriodKind::Custom => "Custom test",
            PeriodKind::Normal => "Normal period",
        }
    }
}

impl From<StressType> for PeriodKind {
    fn from(t: StressType) -> Self {
        match t {
            StressType::SharpDecline => PeriodKind::SharpDecline,
            StressType::SharpRally => PeriodKind::SharpRally,
            StressType::HighVolatility => PeriodKind::HighVolatility,
        }
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identity of a scored slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodInfo {
    pub kind: PeriodKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration_days: usize,
    /// The detected period this slice was cut for, if any
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detected: Option<StressPeriod>,
}

/// Hedged vs. unhedged performance over one slice of backtest records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodPerformance {
    pub period_info: PeriodInfo,
    pub days: usize,
    pub total_hedged_pnl: Pnl,
    pub total_unhedged_pnl: Pnl,
    pub total_spot_pnl: Pnl,
    pub total_future_pnl: Pnl,
    pub avg_daily_hedged_pnl: Pnl,
    pub avg_daily_unhedged_pnl: Pnl,
    pub hedged_volatility: f64,
    pub unhedged_volatility: f64,
    pub max_daily_loss_hedged: Pnl,
    pub max_daily_loss_unhedged: Pnl,
    pub profitable_days_hedged: usize,
    pub profitable_days_unhedged: usize,
    pub profitable_days_ratio_hedged: Rate,
    pub profitable_days_ratio_unhedged: Rate,
    pub var_95_hedged: Pnl,
    pub var_95_unhedged: Pnl,
    pub hedge_advantage: Pnl,
    /// Volatility reduction; 0 when unhedged volatility is not positive
    pub risk_reduction_rate: Rate,
    pub max_drawdown_hedged: Pnl,
    pub max_drawdown_unhedged: Pnl,
}

/// Aggregate across every tested period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressSummary {
    pub total_stress_periods: usize,
    pub total_stress_days: usize,
    pub total_stress_pnl_hedged: Pnl,
    pub total_stress_pnl_unhedged: Pnl,
    pub avg_stress_pnl_hedged: Pnl,
    pub avg_stress_pnl_unhedged: Pnl,
    pub avg_volatility_hedged: f64,
    pub avg_volatility_unhedged: f64,
    pub max_single_loss_hedged: Pnl,
    pub max_single_loss_unhedged: Pnl,
    pub stress_effectiveness: Rate,
    pub stress_vs_normal_pnl_ratio: f64,
    pub stress_vs_normal_volatility_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressTestResult {
    pub test_type: StressTestType,
    pub stress_periods: Vec<PeriodPerformance>,
    pub normal_period_comparison: PeriodPerformance,
    /// Absent when no period was tested
    pub summary: Option<StressSummary>,
}

// ---------------------------------------------------------------------------
// Stress test
// ---------------------------------------------------------------------------

/// Re-score a backtest on stress periods and on the calm remainder.
///
/// Periods are matched to backtest records by date range, so periods
/// detected on the aligned series and on the backtest rows both work.
pub fn run_stress_test(
    backtest: &BacktestResult,
    selection: &StressSelection,
    config: &StressConfig,
) -> HedgeResult<StressTestResult> {
    if backtest.records.is_empty() {
        return Err(HedgeError::InvalidState(
            "backtest result has no records; run a backtest first".into(),
        ));
    }

    let (test_type, stress_periods, tested_ranges) = match selection {
        StressSelection::Custom { start, end } => {
            let range = DateRange::new(*start, *end);
            let slice = slice_records(backtest, range);
            if slice.is_empty() {
                return Err(HedgeError::EmptyInput(format!(
                    "no backtest data between {} and {}",
                    start, end
                )));
            }
            let info = PeriodInfo {
                kind: PeriodKind::Custom,
                start_date: *start,
                end_date: *end,
                duration_days: slice.len(),
                detected: None,
            };
            (
                StressTestType::CustomPeriod,
                vec![period_performance(info, &slice)],
                vec![range],
            )
        }
        StressSelection::Periods(periods) => {
            let scored = score_periods(backtest, periods);
            (StressTestType::IdentifiedPeriods, scored, ranges_of(periods))
        }
        StressSelection::AutoDetect => {
            let periods = identify_stress_periods(&backtest.price_points(), config)?;
            let scored = score_periods(backtest, &periods);
            (StressTestType::IdentifiedPeriods, scored, ranges_of(&periods))
        }
    };

    let normal_period_comparison = normal_period(backtest, &tested_ranges);
    let summary = summarize(&stress_periods, &normal_period_comparison);

    info!(
        test_type = ?test_type,
        periods = stress_periods.len(),
        normal_days = normal_period_comparison.days,
        effectiveness = summary.as_ref().map(|s| s.stress_effectiveness),
        "stress test complete"
    );

    Ok(StressTestResult {
        test_type,
        stress_periods,
        normal_period_comparison,
        summary,
    })
}

fn ranges_of(periods: &[StressPeriod]) -> Vec<DateRange> {
    periods.iter().map(StressPeriod::range).collect()
}

fn slice_records(backtest: &BacktestResult, range: DateRange) -> Vec<&BacktestRecord> {
    backtest.records_within(range)
}

fn score_periods(backtest: &BacktestResult, periods: &[StressPeriod]) -> Vec<PeriodPerformance> {
    periods
        .iter()
        .filter_map(|period| {
            let slice = slice_records(backtest, period.range());
            if slice.is_empty() {
                warn!(
                    start = %period.start_date,
                    end = %period.end_date,
                    "stress period has no matching backtest records; skipped"
                );
                return None;
            }
            let info = PeriodInfo {
                kind: period.stress_type.into(),
                start_date: period.start_date,
                end_date: period.end_date,
                duration_days: period.duration_days,
                detected: Some(period.clone()),
            };
            Some(period_performance(info, &slice))
        })
        .collect()
}

/// Records outside every tested range; all records when that leaves none.
fn normal_period(backtest: &BacktestResult, tested: &[DateRange]) -> PeriodPerformance {
    let mut normal: Vec<&BacktestRecord> = backtest
        .records
        .iter()
        .filter(|r| !tested.iter().any(|range| range.contains(r.date)))
        .collect();
    if normal.is_empty() {
        debug!("no records outside the tested periods; comparing against the full backtest");
        normal = backtest.records.iter().collect();
    }
    let info = PeriodInfo {
        kind: PeriodKind::Normal,
        start_date: normal[0].date,
        end_date: normal[normal.len() - 1].date,
        duration_days: normal.len(),
        detected: None,
    };
    period_performance(info, &normal)
}

/// Caller guarantees `slice` is non-empty.
fn period_performance(period_info: PeriodInfo, slice: &[&BacktestRecord]) -> PeriodPerformance {
    let hedged: Vec<f64> = slice.iter().map(|r| r.total_pnl).collect();
    let unhedged: Vec<f64> = slice.iter().map(|r| r.unhedged_pnl).collect();
    let hedged_cum: Vec<f64> = slice.iter().map(|r| r.total_pnl_cumulative).collect();
    let unhedged_cum: Vec<f64> = slice.iter().map(|r| r.unhedged_pnl_cumulative).collect();

    let days = slice.len();
    let total_hedged_pnl: f64 = hedged.iter().sum();
    let total_unhedged_pnl: f64 = unhedged.iter().sum();
    let hedged_volatility = stats::sample_std(&hedged);
    let unhedged_volatility = stats::sample_std(&unhedged);
    let profitable_days_hedged = count_profitable(&hedged);
    let profitable_days_unhedged = count_profitable(&unhedged);

    let risk_reduction_rate = if unhedged_volatility > 0.0 {
        (unhedged_volatility - hedged_volatility) / unhedged_volatility
    } else {
        0.0
    };

    PeriodPerformance {
        period_info,
        days,
        total_hedged_pnl,
        total_unhedged_pnl,
        total_spot_pnl: slice.iter().map(|r| r.spot_pnl).sum(),
        total_future_pnl: slice.iter().map(|r| r.future_pnl).sum(),
        avg_daily_hedged_pnl: stats::mean(&hedged),
        avg_daily_unhedged_pnl: stats::mean(&unhedged),
        hedged_volatility,
        unhedged_volatility,
        max_daily_loss_hedged: stats::min(&hedged),
        max_daily_loss_unhedged: stats::min(&unhedged),
        profitable_days_hedged,
        profitable_days_unhedged,
        profitable_days_ratio_hedged: profitable_days_hedged as f64 / days as f64,
        profitable_days_ratio_unhedged: profitable_days_unhedged as f64 / days as f64,
        var_95_hedged: stats::percentile(&hedged, VAR_PERCENTILE),
        var_95_unhedged: stats::percentile(&unhedged, VAR_PERCENTILE),
        hedge_advantage: total_hedged_pnl - total_unhedged_pnl,
        risk_reduction_rate,
        max_drawdown_hedged: stats::max_drawdown(&hedged_cum),
        max_drawdown_unhedged: stats::max_drawdown(&unhedged_cum),
    }
}

fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator != 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

fn summarize(periods: &[PeriodPerformance], normal: &PeriodPerformance) -> Option<StressSummary> {
    if periods.is_empty() {
        return None;
    }
    let total_stress_days: usize = periods.iter().map(|p| p.days).sum();
    let total_stress_pnl_hedged: f64 = periods.iter().map(|p| p.total_hedged_pnl).sum();
    let total_stress_pnl_unhedged: f64 = periods.iter().map(|p| p.total_unhedged_pnl).sum();
    let avg_stress_pnl_hedged = total_stress_pnl_hedged / total_stress_days as f64;
    let avg_stress_pnl_unhedged = total_stress_pnl_unhedged / total_stress_days as f64;

    let hedged_vols: Vec<f64> = periods.iter().map(|p| p.hedged_volatility).collect();
    let unhedged_vols: Vec<f64> = periods.iter().map(|p| p.unhedged_volatility).collect();
    let avg_volatility_hedged = stats::mean(&hedged_vols);
    let avg_volatility_unhedged = stats::mean(&unhedged_vols);

    let stress_effectiveness = if avg_volatility_unhedged > 0.0 {
        1.0 - avg_volatility_hedged / avg_volatility_unhedged
    } else {
        0.0
    };

    Some(StressSummary {
        total_stress_periods: periods.len(),
        total_stress_days,
        total_stress_pnl_hedged,
        total_stress_pnl_unhedged,
        avg_stress_pnl_hedged,
        avg_stress_pnl_unhedged,
        avg_volatility_hedged,
        avg_volatility_unhedged,
        max_single_loss_hedged: periods
            .iter()
            .map(|p| p.max_daily_loss_hedged)
            .fold(f64::NAN, f64::min),
        max_single_loss_unhedged: periods
            .iter()
            .map(|p| p.max_daily_loss_unhedged)
            .fold(f64::NAN, f64::min),
        stress_effectiveness,
        stress_vs_normal_pnl_ratio: ratio_or_zero(avg_stress_pnl_hedged, normal.avg_daily_hedged_pnl),
        stress_vs_normal_volatility_ratio: ratio_or_zero(avg_volatility_hedged, normal.hedged_volatility),
    })
}
