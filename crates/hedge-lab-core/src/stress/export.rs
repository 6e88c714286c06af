use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use super::tester::{PeriodKind, StressTestResult};
use crate::export::{read_csv, write_csv};
use crate::types::{Pnl, Rate};
use crate::HedgeResult;

/// One tested period as a flat CSV row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressCsvRow {
    pub period_number: usize,
    pub stress_type: PeriodKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration_days: usize,
    pub total_hedged_pnl: Pnl,
    pub total_unhedged_pnl: Pnl,
    pub hedge_advantage: Pnl,
    pub hedged_volatility: f64,
    pub unhedged_volatility: f64,
    pub risk_reduction_rate: Rate,
    pub max_daily_loss_hedged: Pnl,
    pub max_daily_loss_unhedged: Pnl,
}

/// Flatten the tested periods of a stress test, numbered from 1.
pub fn stress_csv_rows(result: &StressTestResult) -> Vec<StressCsvRow> {
    result
        .stress_periods
        .iter()
        .enumerate()
        .map(|(i, p)| StressCsvRow {
            period_number: i + 1,
            stress_type: p.period_info.kind,
            start_date: p.period_info.start_date,
            end_date: p.period_info.end_date,
            duration_days: p.period_info.duration_days,
            total_hedged_pnl: p.total_hedged_pnl,
            total_unhedged_pnl: p.total_unhedged_pnl,
            hedge_advantage: p.hedge_advantage,
            hedged_volatility: p.hedged_volatility,
            unhedged_volatility: p.unhedged_volatility,
            risk_reduction_rate: p.risk_reduction_rate,
            max_daily_loss_hedged: p.max_daily_loss_hedged,
            max_daily_loss_unhedged: p.max_daily_loss_unhedged,
        })
        .collect()
}

pub fn write_stress_csv<W: Write>(result: &StressTestResult, writer: W) -> HedgeResult<()> {
    write_csv(&stress_csv_rows(result), writer)
}

pub fn read_stress_csv<R: Read>(reader: R) -> HedgeResult<Vec<StressCsvRow>> {
    read_csv(reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::{run_backtest, BacktestParameters, HedgeDirection};
    use crate::data::{AlignedSeries, PricePoint};
    use crate::stress::{run_stress_test, StressConfig, StressSelection};
    use pretty_assertions::assert_eq;

    fn stress_result() -> StressTestResult {
        let start = NaiveDate::from_ymd_opt(2022, 10, 3).unwrap();
        let spot = [
            200.0, 201.0, 200.5, 220.0, 242.0, 266.0, 267.0, 266.5, 240.0, 216.0, 194.0, 195.0,
        ];
        let future = [
            198.0, 199.2, 198.1, 216.3, 239.9, 262.0, 263.5, 262.2, 238.8, 213.1, 192.6, 193.0,
        ];
        let series = AlignedSeries::new(
            (0..spot.len())
                .map(|i| PricePoint {
                    date: start + chrono::Duration::days(i as i64),
                    spot_price: spot[i],
                    future_price: future[i],
                })
                .collect(),
        )
        .unwrap();
        let bt = run_backtest(&series, &BacktestParameters::new(0.97, 100.0, HedgeDirection::ShortHedge)).unwrap();
        run_stress_test(&bt, &StressSelection::AutoDetect, &StressConfig::default()).unwrap()
    }

    #[test]
    fn test_stress_csv_round_trip() {
        let result = stress_result();
        assert_eq!(result.stress_periods.len(), 2);

        let mut buf = Vec::new();
        write_stress_csv(&result, &mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "period_number,stress_type,start_date,end_date,duration_days,total_hedged_pnl,\
             total_unhedged_pnl,hedge_advantage,hedged_volatility,unhedged_volatility,\
             risk_reduction_rate,max_daily_loss_hedged,max_daily_loss_unhedged"
        );

        let rows = read_stress_csv(buf.as_slice()).unwrap();
        assert_eq!(rows, stress_csv_rows(&result));
        assert_eq!(rows[0].period_number, 1);
        assert_eq!(rows[0].stress_type, PeriodKind::SharpRally);
        assert_eq!(rows[1].stress_type, PeriodKind::SharpDecline);
    }
}
