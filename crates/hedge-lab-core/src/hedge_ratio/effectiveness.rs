use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::estimator::PriceChanges;
use crate::data::AlignedSeries;
use crate::error::HedgeError;
use crate::stats;
use crate::types::{Rate, Ratio};
use crate::HedgeResult;

pub const DEFAULT_SENSITIVITY_RANGE: f64 = 0.2;
pub const DEFAULT_SENSITIVITY_STEPS: usize = 20;

// ---------------------------------------------------------------------------
// Effectiveness
// ---------------------------------------------------------------------------

/// Variance reduction achieved by hedging the full series at a fixed ratio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeEffectiveness {
    /// 1 − Var(hedged) / Var(unhedged)
    pub hedge_effectiveness: Rate,
    /// (Var(unhedged) − Var(hedged)) / Var(unhedged)
    pub risk_reduction_rate: Rate,
    pub unhedged_variance: f64,
    pub hedged_variance: f64,
    pub unhedged_volatility: f64,
    pub hedged_volatility: f64,
    /// Var(unhedged) − Var(hedged)
    pub variance_reduction: f64,
}

impl HedgeEffectiveness {
    fn from_variances(unhedged_variance: f64, hedged_variance: f64) -> Self {
        HedgeEffectiveness {
            hedge_effectiveness: 1.0 - hedged_variance / unhedged_variance,
            risk_reduction_rate: (unhedged_variance - hedged_variance) / unhedged_variance,
            unhedged_variance,
            hedged_variance,
            unhedged_volatility: unhedged_variance.sqrt(),
            hedged_volatility: hedged_variance.sqrt(),
            variance_reduction: unhedged_variance - hedged_variance,
        }
    }
}

/// Measure how much of the spot change variance the ratio removes.
pub fn effectiveness(series: &AlignedSeries, hedge_ratio: Ratio) -> HedgeResult<HedgeEffectiveness> {
    let changes = PriceChanges::from_points(series.points())?;
    let unhedged_variance = stats::sample_variance(&changes.spot);
    let hedged_variance = stats::sample_variance(&changes.hedged(hedge_ratio));

    if unhedged_variance == 0.0 {
        warn!("spot price changes have zero variance; effectiveness is undefined");
    }

    let result = HedgeEffectiveness::from_variances(unhedged_variance, hedged_variance);
    debug!(
        hedge_ratio,
        effectiveness = result.hedge_effectiveness,
        "hedge effectiveness computed"
    );
    Ok(result)
}

// ---------------------------------------------------------------------------
// Sensitivity
// ---------------------------------------------------------------------------

/// One point of a sensitivity sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityRow {
    pub hedge_ratio: Ratio,
    pub variance: f64,
    pub volatility: f64,
    pub effectiveness: Rate,
    pub risk_reduction: Rate,
    /// (ratio − base) / base × 100
    pub ratio_deviation_pct: f64,
}

/// Lazily evaluated sweep of hedge ratios around a base value.
///
/// Cloning the sweep before consuming it gives an independent pass over the
/// same ratios.
#[derive(Debug, Clone)]
pub struct SensitivitySweep {
    changes: PriceChanges,
    unhedged_variance: f64,
    base_ratio: Ratio,
    ratios: Vec<Ratio>,
    next: usize,
}

impl SensitivitySweep {
    pub fn base_ratio(&self) -> Ratio {
        self.base_ratio
    }

    /// The ratios the sweep visits, in order.
    pub fn ratios(&self) -> &[Ratio] {
        &self.ratios
    }

    /// Evaluate every remaining ratio.
    pub fn to_table(self) -> Vec<SensitivityRow> {
        self.collect()
    }

    fn row(&self, ratio: Ratio) -> SensitivityRow {
        let variance = stats::sample_variance(&self.changes.hedged(ratio));
        let eff = HedgeEffectiveness::from_variances(self.unhedged_variance, variance);
        SensitivityRow {
            hedge_ratio: ratio,
            variance,
            volatility: eff.hedged_volatility,
            effectiveness: eff.hedge_effectiveness,
            risk_reduction: eff.risk_reduction_rate,
            ratio_deviation_pct: (ratio - self.base_ratio) / self.base_ratio * 100.0,
        }
    }
}

impl Iterator for SensitivitySweep {
    type Item = SensitivityRow;

    fn next(&mut self) -> Option<Self::Item> {
        let ratio = *self.ratios.get(self.next)?;
        self.next += 1;
        Some(self.row(ratio))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.ratios.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SensitivitySweep {}

/// Build a sweep of `steps` ratios spaced evenly over
/// `[base × (1 − range), base × (1 + range)]`.
pub fn sensitivity(
    series: &AlignedSeries,
    base_ratio: Ratio,
    ratio_range: f64,
    steps: usize,
) -> HedgeResult<SensitivitySweep> {
    if steps == 0 {
        return Err(HedgeError::InvalidInput {
            field: "steps".into(),
            reason: "at least one step is required".into(),
        });
    }
    if !ratio_range.is_finite() || ratio_range < 0.0 {
        return Err(HedgeError::InvalidInput {
            field: "ratio_range".into(),
            reason: format!("must be a finite non-negative fraction (got {})", ratio_range),
        });
    }
    let changes = PriceChanges::from_points(series.points())?;
    let unhedged_variance = stats::sample_variance(&changes.spot);
    let ratios = stats::linspace(
        base_ratio * (1.0 - ratio_range),
        base_ratio * (1.0 + ratio_range),
        steps,
    );
    debug!(base_ratio, ratio_range, steps, "sensitivity sweep prepared");
    Ok(SensitivitySweep {
        changes,
        unhedged_variance,
        base_ratio,
        ratios,
        next: 0,
    })
}

/// [`sensitivity`] collected into a table.
pub fn sensitivity_table(
    series: &AlignedSeries,
    base_ratio: Ratio,
    ratio_range: f64,
    steps: usize,
) -> HedgeResult<Vec<SensitivityRow>> {
    Ok(sensitivity(series, base_ratio, ratio_range, steps)?.to_table())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PricePoint;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn lockstep() -> AlignedSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let spot = [100.0, 102.0, 101.0, 105.0, 103.0];
        let future = [50.0, 51.0, 50.5, 52.5, 51.5];
        AlignedSeries::new(
            (0..5)
                .map(|i| PricePoint {
                    date: start + chrono::Duration::days(i as i64),
                    spot_price: spot[i],
                    future_price: future[i],
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_zero_ratio_has_zero_effectiveness() {
        let eff = effectiveness(&lockstep(), 0.0).unwrap();
        assert_eq!(eff.hedge_effectiveness, 0.0);
        assert_eq!(eff.risk_reduction_rate, 0.0);
        assert_eq!(eff.hedged_variance, eff.unhedged_variance);
    }

    #[test]
    fn test_perfect_hedge_removes_all_variance() {
        let eff = effectiveness(&lockstep(), 2.0).unwrap();
        assert_eq!(eff.hedged_variance, 0.0);
        assert_eq!(eff.hedge_effectiveness, 1.0);
        assert!((eff.variance_reduction - eff.unhedged_variance).abs() < 1e-12);
    }

    #[test]
    fn test_over_hedge_can_be_negative() {
        let eff = effectiveness(&lockstep(), 6.0).unwrap();
        assert!(eff.hedge_effectiveness < 0.0);
    }

    #[test]
    fn test_sensitivity_grid_spans_range() {
        let sweep = sensitivity(&lockstep(), 2.0, 0.2, 5).unwrap();
        assert_eq!(sweep.len(), 5);
        let ratios = sweep.ratios().to_vec();
        assert!((ratios[0] - 1.6).abs() < 1e-12);
        assert!((ratios[2] - 2.0).abs() < 1e-12);
        assert!((ratios[4] - 2.4).abs() < 1e-12);

        let table = sweep.to_table();
        assert!((table[2].effectiveness - 1.0).abs() < 1e-12);
        assert!(table[2].ratio_deviation_pct.abs() < 1e-9);
        assert!((table[0].ratio_deviation_pct + 20.0).abs() < 1e-9);
        // Effectiveness peaks at the minimum-variance ratio.
        assert!(table.iter().all(|r| r.effectiveness <= table[2].effectiveness + 1e-12));
    }

    #[test]
    fn test_sensitivity_is_restartable_via_clone() {
        let sweep = sensitivity(&lockstep(), 2.0, 0.1, 4).unwrap();
        let first: Vec<SensitivityRow> = sweep.clone().collect();
        let second = sweep.to_table();
        assert_eq!(first, second);
    }

    #[test]
    fn test_sensitivity_rejects_bad_arguments() {
        assert!(matches!(
            sensitivity(&lockstep(), 2.0, 0.2, 0),
            Err(HedgeError::InvalidInput { .. })
        ));
        assert!(matches!(
            sensitivity(&lockstep(), 2.0, -0.1, 10),
            Err(HedgeError::InvalidInput { .. })
        ));
        assert!(matches!(
            sensitivity(&lockstep(), 2.0, f64::NAN, 10),
            Err(HedgeError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_sweep_rows_agree_with_effectiveness() {
        let series = lockstep();
        for row in sensitivity(&series, 2.0, 0.5, 3).unwrap() {
            let eff = effectiveness(&series, row.hedge_ratio).unwrap();
            assert!((row.effectiveness - eff.hedge_effectiveness).abs() < 1e-12);
            assert!((row.risk_reduction - eff.risk_reduction_rate).abs() < 1e-12);
            assert!((row.variance - eff.hedged_variance).abs() < 1e-12);
            assert!((row.volatility - eff.hedged_volatility).abs() < 1e-12);
        }
    }

    #[test]
    fn test_single_step_is_lower_bound() {
        let table = sensitivity_table(&lockstep(), 2.0, 0.5, 1).unwrap();
        assert_eq!(table.len(), 1);
        assert!((table[0].hedge_ratio - 1.0).abs() < 1e-12);
    }
}
