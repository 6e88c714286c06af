use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use super::metrics::{compute_metrics, PerformanceMetrics};
use crate::data::{AlignedSeries, PricePoint};
use crate::error::HedgeError;
use crate::types::{DateRange, Pnl, Price, Ratio};
use crate::HedgeResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which side of the market the spot exposure sits on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HedgeDirection {
    /// Long spot inventory hedged by selling futures.
    #[default]
    ShortHedge,
    /// Short or planned spot purchases hedged by buying futures.
    LongHedge,
}

/// P&L multipliers implied by a hedge direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionSigns {
    pub spot: f64,
    pub future: f64,
    pub unhedged: f64,
}

impl HedgeDirection {
    pub fn signs(self) -> DirectionSigns {
        match self {
            HedgeDirection::ShortHedge => DirectionSigns {
                spot: 1.0,
                future: -1.0,
                unhedged: 1.0,
            },
            HedgeDirection::LongHedge => DirectionSigns {
                spot: -1.0,
                future: 1.0,
                unhedged: -1.0,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HedgeDirection::ShortHedge => "short_hedge",
            HedgeDirection::LongHedge => "long_hedge",
        }
    }

    /// Human label used in reports.
    pub fn describe(self) -> &'static str {
        match self {
            HedgeDirection::ShortHedge => "Inventory management (sell futures)",
            HedgeDirection::LongHedge => "Procurement management (buy futures)",
        }
    }
}

impl fmt::Display for HedgeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HedgeDirection {
    type Err = HedgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "short_hedge" | "short" => Ok(HedgeDirection::ShortHedge),
            "long_hedge" | "long" => Ok(HedgeDirection::LongHedge),
            other => Err(HedgeError::InvalidInput {
                field: "hedge_direction".into(),
                reason: format!("unknown direction '{}' (expected short_hedge or long_hedge)", other),
            }),
        }
    }
}

/// Inputs to [`run_backtest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestParameters {
    pub hedge_ratio: Ratio,
    pub spot_quantity: f64,
    pub hedge_direction: HedgeDirection,
    #[serde(default = "default_contract_size")]
    pub future_contract_size: f64,
}

fn default_contract_size() -> f64 {
    1.0
}

impl BacktestParameters {
    pub fn new(hedge_ratio: Ratio, spot_quantity: f64, hedge_direction: HedgeDirection) -> Self {
        BacktestParameters {
            hedge_ratio,
            spot_quantity,
            hedge_direction,
            future_contract_size: default_contract_size(),
        }
    }
}

/// Hedge parameters echoed on every result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HedgeParameters {
    pub hedge_ratio: Ratio,
    pub spot_quantity: f64,
    pub future_quantity: f64,
    pub hedge_direction: HedgeDirection,
    pub future_contract_size: f64,
}

/// One simulated trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRecord {
    pub date: NaiveDate,
    pub spot_price: Price,
    pub future_price: Price,
    pub spot_price_change: f64,
    pub future_price_change: f64,
    pub spot_pnl: Pnl,
    pub future_pnl: Pnl,
    /// spot_pnl + future_pnl
    pub total_pnl: Pnl,
    pub unhedged_pnl: Pnl,
    pub total_pnl_cumulative: Pnl,
    pub unhedged_pnl_cumulative: Pnl,
    pub spot_pnl_cumulative: Pnl,
    pub future_pnl_cumulative: Pnl,
}

/// Output of [`run_backtest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub records: Vec<BacktestRecord>,
    pub metrics: PerformanceMetrics,
    pub parameters: HedgeParameters,
}

impl BacktestResult {
    pub fn date_range(&self) -> Option<DateRange> {
        match (self.records.first(), self.records.last()) {
            (Some(first), Some(last)) => Some(DateRange::new(first.date, last.date)),
            _ => None,
        }
    }

    /// The price rows the records were simulated on, first day excluded.
    pub fn price_points(&self) -> Vec<PricePoint> {
        self.records
            .iter()
            .map(|r| PricePoint {
                date: r.date,
                spot_price: r.spot_price,
                future_price: r.future_price,
            })
            .collect()
    }

    /// Records whose date lies inside `range`, in order.
    pub fn records_within(&self, range: DateRange) -> Vec<&BacktestRecord> {
        self.records.iter().filter(|r| range.contains(r.date)).collect()
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Replay the aligned price history through a static hedge.
///
/// Day one has no price change and is not part of the output; every other
/// day becomes one [`BacktestRecord`]. The futures position is
/// `spot_quantity × hedge_ratio` for the whole run.
pub fn run_backtest(series: &AlignedSeries, params: &BacktestParameters) -> HedgeResult<BacktestResult> {
    let points = series.points();
    if points.is_empty() {
        return Err(HedgeError::EmptyInput("no price data to backtest".into()));
    }
    if points.len() < 2 {
        return Err(HedgeError::InsufficientData(
            "backtest needs at least 2 price points to form one daily change".into(),
        ));
    }
    debug!(
        rows = points.len(),
        ratio = params.hedge_ratio,
        direction = %params.hedge_direction,
        "running backtest"
    );

    let q = params.spot_quantity;
    let fq = q * params.hedge_ratio;
    let signs = params.hedge_direction.signs();

    let mut records = Vec::with_capacity(points.len() - 1);
    let (mut cum_total, mut cum_unhedged, mut cum_spot, mut cum_future) = (0.0, 0.0, 0.0, 0.0);
    for pair in points.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        let spot_change = cur.spot_price - prev.spot_price;
        let future_change = cur.future_price - prev.future_price;

        let spot_pnl = signs.spot * q * spot_change;
        let future_pnl = signs.future * fq * future_change;
        let total_pnl = spot_pnl + future_pnl;
        let unhedged_pnl = signs.unhedged * q * spot_change;

        cum_total += total_pnl;
        cum_unhedged += unhedged_pnl;
        cum_spot += spot_pnl;
        cum_future += future_pnl;

        records.push(BacktestRecord {
            date: cur.date,
            spot_price: cur.spot_price,
            future_price: cur.future_price,
            spot_price_change: spot_change,
            future_price_change: future_change,
            spot_pnl,
            future_pnl,
            total_pnl,
            unhedged_pnl,
            total_pnl_cumulative: cum_total,
            unhedged_pnl_cumulative: cum_unhedged,
            spot_pnl_cumulative: cum_spot,
            future_pnl_cumulative: cum_future,
        });
    }

    let metrics = compute_metrics(&records, fq)?;
    info!(
        days = metrics.total_days,
        hedged_pnl = metrics.total_hedged_pnl,
        unhedged_pnl = metrics.total_unhedged_pnl,
        effectiveness = metrics.hedging_effectiveness,
        "backtest complete"
    );

    Ok(BacktestResult {
        records,
        metrics,
        parameters: HedgeParameters {
            hedge_ratio: params.hedge_ratio,
            spot_quantity: q,
            future_quantity: fq,
            hedge_direction: params.hedge_direction,
            future_contract_size: params.future_contract_size,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn series(rows: &[(u32, f64, f64)]) -> AlignedSeries {
        AlignedSeries::new(
            rows.iter()
                .map(|(day, s, f)| PricePoint {
                    date: d(*day),
                    spot_price: *s,
                    future_price: *f,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_short_hedge_single_day() {
        let s = series(&[(1, 100.0, 80.0), (2, 105.0, 84.0)]);
        let result = run_backtest(&s, &BacktestParameters::new(0.5, 10.0, HedgeDirection::ShortHedge)).unwrap();
        assert_eq!(result.records.len(), 1);
        let r = &result.records[0];
        assert_eq!(r.date, d(2));
        assert_eq!(r.spot_pnl, 50.0);
        assert_eq!(r.future_pnl, -20.0);
        assert_eq!(r.total_pnl, 30.0);
        assert_eq!(r.unhedged_pnl, 50.0);
        assert_eq!(result.parameters.future_quantity, 5.0);
    }

    #[test]
    fn test_long_hedge_flips_signs() {
        let s = series(&[(1, 100.0, 80.0), (2, 105.0, 84.0)]);
        let result = run_backtest(&s, &BacktestParameters::new(0.5, 10.0, HedgeDirection::LongHedge)).unwrap();
        let r = &result.records[0];
        assert_eq!(r.spot_pnl, -50.0);
        assert_eq!(r.future_pnl, 20.0);
        assert_eq!(r.total_pnl, -30.0);
        assert_eq!(r.unhedged_pnl, -50.0);
    }

    #[test]
    fn test_direction_signs_mirror_each_other() {
        let short = HedgeDirection::ShortHedge.signs();
        let long = HedgeDirection::LongHedge.signs();
        assert_eq!(
            short,
            DirectionSigns {
                spot: 1.0,
                future: -1.0,
                unhedged: 1.0,
            }
        );
        assert_eq!(
            long,
            DirectionSigns {
                spot: -short.spot,
                future: -short.future,
                unhedged: -short.unhedged,
            }
        );
    }

    #[test]
    fn test_cumulative_columns_are_running_sums() {
        let s = series(&[
            (1, 100.0, 50.0),
            (2, 103.0, 51.0),
            (3, 101.0, 50.2),
            (4, 99.5, 49.0),
            (5, 104.0, 52.5),
        ]);
        let result = run_backtest(&s, &BacktestParameters::new(1.3, 20.0, HedgeDirection::ShortHedge)).unwrap();
        let mut total = 0.0;
        let mut unhedged = 0.0;
        let mut spot = 0.0;
        let mut future = 0.0;
        for r in &result.records {
            assert!((r.total_pnl - (r.spot_pnl + r.future_pnl)).abs() < 1e-9);
            total += r.total_pnl;
            unhedged += r.unhedged_pnl;
            spot += r.spot_pnl;
            future += r.future_pnl;
            assert!((r.total_pnl_cumulative - total).abs() < 1e-9);
            assert!((r.unhedged_pnl_cumulative - unhedged).abs() < 1e-9);
            assert!((r.spot_pnl_cumulative - spot).abs() < 1e-9);
            assert!((r.future_pnl_cumulative - future).abs() < 1e-9);
        }
    }

    #[test]
    fn test_single_point_is_insufficient() {
        let s = series(&[(1, 100.0, 80.0)]);
        let err = run_backtest(&s, &BacktestParameters::new(1.0, 1.0, HedgeDirection::ShortHedge)).unwrap_err();
        assert!(matches!(err, HedgeError::InsufficientData(_)));
    }

    #[test]
    fn test_direction_parse_and_display() {
        assert_eq!("short_hedge".parse::<HedgeDirection>().unwrap(), HedgeDirection::ShortHedge);
        assert_eq!("long-hedge".parse::<HedgeDirection>().unwrap(), HedgeDirection::LongHedge);
        assert!("sideways".parse::<HedgeDirection>().is_err());
        assert_eq!(HedgeDirection::LongHedge.to_string(), "long_hedge");
        assert_eq!(
            serde_json::to_string(&HedgeDirection::ShortHedge).unwrap(),
            "\"short_hedge\""
        );
    }

    #[test]
    fn test_records_within_range() {
        let s = series(&[(1, 1.0, 1.0), (2, 2.0, 2.0), (3, 3.0, 3.0), (4, 4.0, 4.0)]);
        let result = run_backtest(&s, &BacktestParameters::new(1.0, 1.0, HedgeDirection::ShortHedge)).unwrap();
        assert_eq!(result.date_range(), Some(DateRange::new(d(2), d(4))));
        let slice = result.records_within(DateRange::new(d(3), d(9)));
        assert_eq!(slice.len(), 2);
        assert_eq!(slice[0].date, d(3));
    }
}
