use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::metrics::{count_profitable, PerformanceMetrics};
use super::simulator::{BacktestRecord, BacktestResult, HedgeParameters};
use crate::error::HedgeError;
use crate::stats;
use crate::types::{DateRange, Pnl};
use crate::HedgeResult;

// ---------------------------------------------------------------------------
// Period analysis
// ---------------------------------------------------------------------------

/// Reduced metrics over a date sub-range of a backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodMetrics {
    pub days: usize,
    pub total_hedged_pnl: Pnl,
    pub total_unhedged_pnl: Pnl,
    pub avg_daily_hedged_pnl: Pnl,
    pub avg_daily_unhedged_pnl: Pnl,
    pub hedged_volatility: f64,
    pub unhedged_volatility: f64,
    pub max_daily_loss_hedged: Pnl,
    pub max_daily_loss_unhedged: Pnl,
    pub profitable_days_hedged: usize,
    pub profitable_days_unhedged: usize,
    /// Hedged total minus unhedged total
    pub hedge_advantage: Pnl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodAnalysis {
    pub range: DateRange,
    pub records: Vec<BacktestRecord>,
    pub metrics: PeriodMetrics,
}

/// Slice a backtest to the inclusive range `[start, end]` and summarize it.
pub fn period_analysis(result: &BacktestResult, start: NaiveDate, end: NaiveDate) -> HedgeResult<PeriodAnalysis> {
    let range = DateRange::new(start, end);
    if range.is_inverted() {
        return Err(HedgeError::EmptyInput(format!(
            "period start {} is after end {}",
            start, end
        )));
    }
    let records: Vec<BacktestRecord> = result.records_within(range).into_iter().cloned().collect();
    if records.is_empty() {
        return Err(HedgeError::EmptyInput(format!(
            "no backtest data between {} and {}",
            start, end
        )));
    }

    let hedged: Vec<f64> = records.iter().map(|r| r.total_pnl).collect();
    let unhedged: Vec<f64> = records.iter().map(|r| r.unhedged_pnl).collect();
    let total_hedged_pnl: f64 = hedged.iter().sum();
    let total_unhedged_pnl: f64 = unhedged.iter().sum();

    let metrics = PeriodMetrics {
        days: records.len(),
        total_hedged_pnl,
        total_unhedged_pnl,
        avg_daily_hedged_pnl: stats::mean(&hedged),
        avg_daily_unhedged_pnl: stats::mean(&unhedged),
        hedged_volatility: stats::sample_std(&hedged),
        unhedged_volatility: stats::sample_std(&unhedged),
        max_daily_loss_hedged: stats::min(&hedged),
        max_daily_loss_unhedged: stats::min(&unhedged),
        profitable_days_hedged: count_profitable(&hedged),
        profitable_days_unhedged: count_profitable(&unhedged),
        hedge_advantage: total_hedged_pnl - total_unhedged_pnl,
    };
    debug!(%start, %end, days = metrics.days, "period analysed");

    Ok(PeriodAnalysis {
        range,
        records,
        metrics,
    })
}

// ---------------------------------------------------------------------------
// Rolling metrics
// ---------------------------------------------------------------------------

pub const DEFAULT_ROLLING_WINDOW: usize = 30;

/// Trailing-window statistics for one record. Fields are `None` until the
/// window is full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingMetricsRow {
    pub date: NaiveDate,
    pub rolling_volatility_hedged: Option<f64>,
    pub rolling_volatility_unhedged: Option<f64>,
    pub rolling_sharpe_hedged: Option<f64>,
    pub rolling_sharpe_unhedged: Option<f64>,
    /// Correlation of spot and futures price changes inside the window
    pub rolling_corr: Option<f64>,
}

/// Trailing-window volatility, mean/volatility and change correlation.
pub fn rolling_metrics(result: &BacktestResult, window: usize) -> HedgeResult<Vec<RollingMetricsRow>> {
    if window < 2 {
        return Err(HedgeError::InvalidInput {
            field: "window".into(),
            reason: format!("rolling window must be at least 2 (got {})", window),
        });
    }
    let hedged: Vec<f64> = result.records.iter().map(|r| r.total_pnl).collect();
    let unhedged: Vec<f64> = result.records.iter().map(|r| r.unhedged_pnl).collect();
    let spot_changes: Vec<f64> = result.records.iter().map(|r| r.spot_price_change).collect();
    let future_changes: Vec<f64> = result.records.iter().map(|r| r.future_price_change).collect();

    let rows = result
        .records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            if i + 1 < window {
                return RollingMetricsRow {
                    date: record.date,
                    rolling_volatility_hedged: None,
                    rolling_volatility_unhedged: None,
                    rolling_sharpe_hedged: None,
                    rolling_sharpe_unhedged: None,
                    rolling_corr: None,
                };
            }
            let span = i + 1 - window..i + 1;
            let h = &hedged[span.clone()];
            let u = &unhedged[span.clone()];
            let vol_h = stats::sample_std(h);
            let vol_u = stats::sample_std(u);
            RollingMetricsRow {
                date: record.date,
                rolling_volatility_hedged: Some(vol_h),
                rolling_volatility_unhedged: Some(vol_u),
                rolling_sharpe_hedged: Some(stats::mean(h) / vol_h),
                rolling_sharpe_unhedged: Some(stats::mean(u) / vol_u),
                rolling_corr: Some(stats::correlation(
                    &spot_changes[span.clone()],
                    &future_changes[span],
                )),
            }
        })
        .collect::<Vec<_>>();
    debug!(window, rows = rows.len(), "rolling metrics computed");
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Performance summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryItem {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarySection {
    pub title: String,
    pub items: Vec<SummaryItem>,
}

/// Display-ready digest of a backtest, grouped into titled sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub sections: Vec<SummarySection>,
}

impl PerformanceSummary {
    pub fn section(&self, title: &str) -> Option<&SummarySection> {
        self.sections.iter().find(|s| s.title == title)
    }
}

impl SummarySection {
    fn new(title: &str, items: Vec<(&str, String)>) -> Self {
        SummarySection {
            title: title.to_string(),
            items: items
                .into_iter()
                .map(|(label, value)| SummaryItem {
                    label: label.to_string(),
                    value,
                })
                .collect(),
        }
    }

    pub fn value(&self, label: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|i| i.label == label)
            .map(|i| i.value.as_str())
    }
}

/// Fixed-point rendering; non-finite values print as "N/A".
pub fn format_fixed(value: f64, decimals: usize) -> String {
    if value.is_finite() {
        format!("{:.*}", decimals, value)
    } else {
        "N/A".to_string()
    }
}

/// Decimal rate rendered as a percentage with two decimals.
pub fn format_percent(rate: f64) -> String {
    if rate.is_finite() {
        format!("{:.2}%", rate * 100.0)
    } else {
        "N/A".to_string()
    }
}

pub const SECTION_STRATEGY: &str = "Strategy";
pub const SECTION_PNL: &str = "P&L";
pub const SECTION_RISK: &str = "Risk control";
pub const SECTION_OTHER: &str = "Other metrics";

/// Group the backtest's parameters and metrics into report sections.
pub fn performance_summary(result: &BacktestResult) -> PerformanceSummary {
    summarize_performance(&result.parameters, &result.metrics)
}

fn summarize_performance(params: &HedgeParameters, m: &PerformanceMetrics) -> PerformanceSummary {
    PerformanceSummary {
        sections: vec![
            SummarySection::new(
                SECTION_STRATEGY,
                vec![
                    ("Hedge direction", params.hedge_direction.describe().to_string()),
                    ("Hedge ratio", format_fixed(params.hedge_ratio, 4)),
                    ("Spot quantity", format_fixed(params.spot_quantity, 2)),
                    ("Futures quantity", format_fixed(params.future_quantity, 4)),
                    ("Backtest period", format!("{} to {}", m.start_date, m.end_date)),
                    ("Trading days", m.total_days.to_string()),
                ],
            ),
            SummarySection::new(
                SECTION_PNL,
                vec![
                    ("Hedged total P&L", format_fixed(m.total_hedged_pnl, 2)),
                    ("Unhedged total P&L", format_fixed(m.total_unhedged_pnl, 2)),
                    (
                        "Hedge advantage",
                        format_fixed(m.total_hedged_pnl - m.total_unhedged_pnl, 2),
                    ),
                    ("Average daily P&L (hedged)", format_fixed(m.avg_daily_hedged_pnl, 2)),
                    ("Average daily P&L (unhedged)", format_fixed(m.avg_daily_unhedged_pnl, 2)),
                ],
            ),
            SummarySection::new(
                SECTION_RISK,
                vec![
                    ("Hedged volatility", format_fixed(m.hedged_volatility, 2)),
                    ("Unhedged volatility", format_fixed(m.unhedged_volatility, 2)),
                    ("Volatility reduction", format_percent(m.volatility_reduction_rate)),
                    ("Max drawdown (hedged)", format_fixed(m.max_drawdown_hedged, 2)),
                    ("Max drawdown (unhedged)", format_fixed(m.max_drawdown_unhedged, 2)),
                    ("Hedging effectiveness", format_percent(m.hedging_effectiveness)),
                ],
            ),
            SummarySection::new(
                SECTION_OTHER,
                vec![
                    (
                        "Profitable days (hedged)",
                        format_percent(m.profitable_days_ratio_hedged),
                    ),
                    (
                        "Profitable days (unhedged)",
                        format_percent(m.profitable_days_ratio_unhedged),
                    ),
                    ("Sharpe ratio (hedged)", format_fixed(m.sharpe_ratio_hedged, 4)),
                    ("Sharpe ratio (unhedged)", format_fixed(m.sharpe_ratio_unhedged, 4)),
                    ("VaR 95% (hedged)", format_fixed(m.var_95_hedged, 2)),
                    ("VaR 95% (unhedged)", format_fixed(m.var_95_unhedged, 2)),
                ],
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::{run_backtest, BacktestParameters, HedgeDirection};
    use crate::data::{AlignedSeries, PricePoint};
    use pretty_assertions::assert_eq;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, day).unwrap()
    }

    fn backtest() -> BacktestResult {
        let spot = [100.0, 101.0, 99.0, 102.0, 104.0, 103.0, 107.0, 105.0];
        let future = [90.0, 90.8, 89.5, 91.5, 93.0, 92.6, 95.5, 94.0];
        let series = AlignedSeries::new(
            (0..spot.len())
                .map(|i| PricePoint {
                    date: d(1 + i as u32),
                    spot_price: spot[i],
                    future_price: future[i],
                })
                .collect(),
        )
        .unwrap();
        run_backtest(&series, &BacktestParameters::new(1.0, 10.0, HedgeDirection::ShortHedge)).unwrap()
    }

    #[test]
    fn test_period_analysis_inclusive_range() {
        let bt = backtest();
        let p = period_analysis(&bt, d(3), d(5)).unwrap();
        assert_eq!(p.metrics.days, 3);
        assert_eq!(p.records.first().map(|r| r.date), Some(d(3)));
        assert_eq!(p.records.last().map(|r| r.date), Some(d(5)));
        let expected: f64 = bt.records[1..4].iter().map(|r| r.total_pnl).sum();
        assert!((p.metrics.total_hedged_pnl - expected).abs() < 1e-9);
        assert!(
            (p.metrics.hedge_advantage - (p.metrics.total_hedged_pnl - p.metrics.total_unhedged_pnl)).abs()
                < 1e-12
        );
    }

    #[test]
    fn test_period_analysis_inverted_or_empty() {
        let bt = backtest();
        assert!(matches!(
            period_analysis(&bt, d(6), d(3)),
            Err(HedgeError::EmptyInput(_))
        ));
        assert!(matches!(
            period_analysis(&bt, d(20), d(25)),
            Err(HedgeError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_rolling_warmup_rows_are_none() {
        let bt = backtest();
        let rows = rolling_metrics(&bt, 3).unwrap();
        assert_eq!(rows.len(), bt.records.len());
        assert!(rows[0].rolling_volatility_hedged.is_none());
        assert!(rows[1].rolling_corr.is_none());
        let third = &rows[2];
        let h: Vec<f64> = bt.records[0..3].iter().map(|r| r.total_pnl).collect();
        assert_eq!(third.rolling_volatility_hedged, Some(stats::sample_std(&h)));
        assert!(third.rolling_corr.is_some());
    }

    #[test]
    fn test_rolling_window_too_small() {
        assert!(matches!(
            rolling_metrics(&backtest(), 1),
            Err(HedgeError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_rolling_window_longer_than_history() {
        let rows = rolling_metrics(&backtest(), 30).unwrap();
        assert!(rows.iter().all(|r| r.rolling_sharpe_unhedged.is_none()));
    }

    #[test]
    fn test_performance_summary_sections() {
        let summary = performance_summary(&backtest());
        let titles: Vec<&str> = summary.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec![SECTION_STRATEGY, SECTION_PNL, SECTION_RISK, SECTION_OTHER]);
        let strategy = summary.section(SECTION_STRATEGY).unwrap();
        assert_eq!(strategy.value("Hedge ratio"), Some("1.0000"));
        assert_eq!(strategy.value("Trading days"), Some("7"));
    }

    #[test]
    fn test_formatting_helpers() {
        assert_eq!(format_fixed(1.23456, 2), "1.23");
        assert_eq!(format_fixed(f64::NAN, 2), "N/A");
        assert_eq!(format_percent(0.4567), "45.67%");
        assert_eq!(format_percent(f64::INFINITY), "N/A");
    }
}
