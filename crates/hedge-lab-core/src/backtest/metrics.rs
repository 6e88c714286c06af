use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::simulator::BacktestRecord;
use crate::error::HedgeError;
use crate::stats;
use crate::types::{Pnl, Rate};
use crate::HedgeResult;

/// Transaction cost assumed on the futures notional (0.1%).
pub const HEDGE_COST_RATE: f64 = 0.001;

/// Confidence level of the historical VaR, as a percentile of daily P&L.
pub const VAR_PERCENTILE: f64 = 5.0;

/// Risk and return statistics of a backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_days: usize,

    // -- P&L totals --
    pub total_hedged_pnl: Pnl,
    pub total_unhedged_pnl: Pnl,
    pub total_spot_pnl: Pnl,
    pub total_future_pnl: Pnl,
    pub avg_daily_hedged_pnl: Pnl,
    pub avg_daily_unhedged_pnl: Pnl,

    // -- Win rate --
    pub profitable_days_hedged: usize,
    pub profitable_days_unhedged: usize,
    pub profitable_days_ratio_hedged: Rate,
    pub profitable_days_ratio_unhedged: Rate,

    // -- Risk --
    pub hedged_volatility: f64,
    pub unhedged_volatility: f64,
    pub max_drawdown_hedged: Pnl,
    pub max_drawdown_unhedged: Pnl,
    pub sharpe_ratio_hedged: f64,
    pub sharpe_ratio_unhedged: f64,

    // -- Hedge quality --
    pub variance_reduction_rate: Rate,
    pub volatility_reduction_rate: Rate,
    pub hedging_effectiveness: Rate,
    pub estimated_hedge_cost: f64,

    // -- Extremes --
    pub max_daily_gain_hedged: Pnl,
    pub max_daily_loss_hedged: Pnl,
    pub max_daily_gain_unhedged: Pnl,
    pub max_daily_loss_unhedged: Pnl,
    pub var_95_hedged: Pnl,
    pub var_95_unhedged: Pnl,

    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Mean over standard deviation, or 0 when the deviation is not positive.
pub fn sharpe_ratio(mean: f64, volatility: f64) -> f64 {
    if volatility > 0.0 {
        mean / volatility
    } else {
        0.0
    }
}

/// Number of strictly positive values.
pub fn count_profitable(values: &[f64]) -> usize {
    values.iter().filter(|v| **v > 0.0).count()
}

/// Derive [`PerformanceMetrics`] from simulated records.
pub fn compute_metrics(records: &[BacktestRecord], future_quantity: f64) -> HedgeResult<PerformanceMetrics> {
    let (first, last) = match (records.first(), records.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(HedgeError::EmptyInput("no backtest records to measure".into())),
    };

    let hedged: Vec<f64> = records.iter().map(|r| r.total_pnl).collect();
    let unhedged: Vec<f64> = records.iter().map(|r| r.unhedged_pnl).collect();
    let future_prices: Vec<f64> = records.iter().map(|r| r.future_price).collect();
    let hedged_cum: Vec<f64> = records.iter().map(|r| r.total_pnl_cumulative).collect();
    let unhedged_cum: Vec<f64> = records.iter().map(|r| r.unhedged_pnl_cumulative).collect();

    let total_days = records.len();
    let avg_daily_hedged_pnl = stats::mean(&hedged);
    let avg_daily_unhedged_pnl = stats::mean(&unhedged);
    let profitable_days_hedged = count_profitable(&hedged);
    let profitable_days_unhedged = count_profitable(&unhedged);

    let hedged_variance = stats::sample_variance(&hedged);
    let unhedged_variance = stats::sample_variance(&unhedged);
    let hedged_volatility = hedged_variance.sqrt();
    let unhedged_volatility = unhedged_variance.sqrt();

    // Three separately computed fields; variance and volatility reductions
    // are not interchangeable.
    let variance_reduction_rate = (unhedged_variance - hedged_variance) / unhedged_variance;
    let volatility_reduction_rate = (unhedged_volatility - hedged_volatility) / unhedged_volatility;
    let hedging_effectiveness = (unhedged_variance - hedged_variance) / unhedged_variance;

    if !variance_reduction_rate.is_finite() {
        warn!(
            days = total_days,
            unhedged_variance, "unhedged P&L variance is zero or undefined; reduction rates are NaN"
        );
    }

    Ok(PerformanceMetrics {
        total_days,
        total_hedged_pnl: hedged.iter().sum(),
        total_unhedged_pnl: unhedged.iter().sum(),
        total_spot_pnl: records.iter().map(|r| r.spot_pnl).sum(),
        total_future_pnl: records.iter().map(|r| r.future_pnl).sum(),
        avg_daily_hedged_pnl,
        avg_daily_unhedged_pnl,
        profitable_days_hedged,
        profitable_days_unhedged,
        profitable_days_ratio_hedged: profitable_days_hedged as f64 / total_days as f64,
        profitable_days_ratio_unhedged: profitable_days_unhedged as f64 / total_days as f64,
        hedged_volatility,
        unhedged_volatility,
        max_drawdown_hedged: stats::max_drawdown(&hedged_cum),
        max_drawdown_unhedged: stats::max_drawdown(&unhedged_cum),
        sharpe_ratio_hedged: sharpe_ratio(avg_daily_hedged_pnl, hedged_volatility),
        sharpe_ratio_unhedged: sharpe_ratio(avg_daily_unhedged_pnl, unhedged_volatility),
        variance_reduction_rate,
        volatility_reduction_rate,
        hedging_effectiveness,
        estimated_hedge_cost: future_quantity.abs() * stats::mean(&future_prices) * HEDGE_COST_RATE,
        max_daily_gain_hedged: stats::max(&hedged),
        max_daily_loss_hedged: stats::min(&hedged),
        max_daily_gain_unhedged: stats::max(&unhedged),
        max_daily_loss_unhedged: stats::min(&unhedged),
        var_95_hedged: stats::percentile(&hedged, VAR_PERCENTILE),
        var_95_unhedged: stats::percentile(&unhedged, VAR_PERCENTILE),
        start_date: first.date,
        end_date: last.date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::{run_backtest, BacktestParameters, HedgeDirection};
    use crate::data::{AlignedSeries, PricePoint};

    fn series(spot: &[f64], future: &[f64]) -> AlignedSeries {
        let start = NaiveDate::from_ymd_opt(2023, 9, 1).unwrap();
        AlignedSeries::new(
            spot.iter()
                .zip(future)
                .enumerate()
                .map(|(i, (s, f))| PricePoint {
                    date: start + chrono::Duration::days(i as i64),
                    spot_price: *s,
                    future_price: *f,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_flat_prices_give_zero_sharpe() {
        let s = series(&[50.0; 6], &[40.0; 6]);
        let m = run_backtest(&s, &BacktestParameters::new(1.0, 10.0, HedgeDirection::ShortHedge))
            .unwrap()
            .metrics;
        assert_eq!(m.hedged_volatility, 0.0);
        assert_eq!(m.sharpe_ratio_hedged, 0.0);
        assert_eq!(m.sharpe_ratio_unhedged, 0.0);
        assert!(m.variance_reduction_rate.is_nan());
        assert_eq!(m.max_drawdown_hedged, 0.0);
    }

    #[test]
    fn test_perfect_hedge_metrics() {
        // Futures move exactly half as much; ratio 2 cancels every change.
        let s = series(&[100.0, 102.0, 101.0, 105.0, 103.0], &[50.0, 51.0, 50.5, 52.5, 51.5]);
        let m = run_backtest(&s, &BacktestParameters::new(2.0, 10.0, HedgeDirection::ShortHedge))
            .unwrap()
            .metrics;
        assert_eq!(m.total_days, 4);
        assert_eq!(m.total_hedged_pnl, 0.0);
        assert_eq!(m.total_unhedged_pnl, 30.0);
        assert_eq!(m.hedging_effectiveness, 1.0);
        assert_eq!(m.variance_reduction_rate, 1.0);
        assert_eq!(m.volatility_reduction_rate, 1.0);
        assert_eq!(m.profitable_days_unhedged, 2);
        assert_eq!(m.profitable_days_ratio_unhedged, 0.5);
        assert_eq!(m.max_daily_gain_unhedged, 40.0);
        assert_eq!(m.max_daily_loss_unhedged, -20.0);
        // Cumulative unhedged: 20, 10, 50, 30
        assert_eq!(m.max_drawdown_unhedged, -20.0);
        // Future quantity 20, mean future price 51.375
        assert!((m.estimated_hedge_cost - 20.0 * 51.375 * 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_var_is_fifth_percentile() {
        let s = series(
            &[10.0, 11.0, 9.0, 12.0, 8.0, 13.0, 7.0],
            &[10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0],
        );
        let m = run_backtest(&s, &BacktestParameters::new(1.0, 1.0, HedgeDirection::ShortHedge))
            .unwrap()
            .metrics;
        // Unhedged daily P&L: 1, -2, 3, -4, 5, -6
        let expected = stats::percentile(&[1.0, -2.0, 3.0, -4.0, 5.0, -6.0], 5.0);
        assert!((m.var_95_unhedged - expected).abs() < 1e-12);
        assert!((expected - (-5.5)).abs() < 1e-12);
    }

    #[test]
    fn test_volatility_and_variance_reduction_differ() {
        let s = series(
            &[100.0, 103.0, 99.0, 104.0, 101.0, 106.0],
            &[100.0, 101.0, 99.5, 102.0, 101.0, 103.0],
        );
        let m = run_backtest(&s, &BacktestParameters::new(1.0, 1.0, HedgeDirection::ShortHedge))
            .unwrap()
            .metrics;
        assert_eq!(m.hedging_effectiveness, m.variance_reduction_rate);
        assert!((m.variance_reduction_rate - m.volatility_reduction_rate).abs() > 1e-6);
    }

    #[test]
    fn test_empty_records_rejected() {
        assert!(matches!(compute_metrics(&[], 1.0), Err(HedgeError::EmptyInput(_))));
    }
}
