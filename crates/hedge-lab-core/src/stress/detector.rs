use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::data::PricePoint;
use crate::error::HedgeError;
use crate::stats;
use crate::types::DateRange;
use crate::HedgeResult;

/// Share of `threshold × duration` the cumulative move must exceed for a
/// run to count as directional rather than choppy.
pub const STRESS_CLASSIFICATION_FACTOR: f64 = 0.3;

pub const DEFAULT_PRICE_CHANGE_THRESHOLD: f64 = 5.0;
pub const DEFAULT_MIN_CONSECUTIVE_DAYS: usize = 3;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Detection thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    /// Absolute daily spot move, in percent, above which a day is extreme
    pub price_change_threshold: f64,
    /// Shortest run of extreme days reported as a stress period
    pub min_consecutive_days: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        StressConfig {
            price_change_threshold: DEFAULT_PRICE_CHANGE_THRESHOLD,
            min_consecutive_days: DEFAULT_MIN_CONSECUTIVE_DAYS,
        }
    }
}

impl StressConfig {
    pub fn validate(&self) -> HedgeResult<()> {
        if !self.price_change_threshold.is_finite() || self.price_change_threshold < 0.0 {
            return Err(HedgeError::InvalidInput {
                field: "price_change_threshold".into(),
                reason: format!(
                    "must be a finite non-negative percentage (got {})",
                    self.price_change_threshold
                ),
            });
        }
        if self.min_consecutive_days == 0 {
            return Err(HedgeError::InvalidInput {
                field: "min_consecutive_days".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressType {
    SharpDecline,
    SharpRally,
    HighVolatility,
}

impl StressType {
    pub fn label(self) -> &'static str {
        match self {
            StressType::SharpDecline => "Sharp decline",
            StressType::SharpRally => "Sharp rally",
            StressType::HighVolatility => "High volatility",
        }
    }

    /// Classify a run by its cumulative spot move relative to
    /// `threshold × duration × STRESS_CLASSIFICATION_FACTOR`.
    pub fn classify(cumulative_change_pct: f64, threshold: f64, duration_days: usize) -> Self {
        let band = threshold * duration_days as f64 * STRESS_CLASSIFICATION_FACTOR;
        if cumulative_change_pct < -band {
            StressType::SharpDecline
        } else if cumulative_change_pct > band {
            StressType::SharpRally
        } else {
            StressType::HighVolatility
        }
    }
}

impl fmt::Display for StressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A maximal run of consecutive extreme-move days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressPeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration_days: usize,
    /// Row offsets into the price rows the period was detected on
    pub start_index: usize,
    pub end_index: usize,
    pub spot_price_change: f64,
    pub spot_price_change_pct: f64,
    pub future_price_change: f64,
    pub future_price_change_pct: f64,
    /// Largest absolute daily spot move, percent
    pub max_daily_spot_change: f64,
    /// Mean absolute daily spot move, percent
    pub avg_daily_spot_change: f64,
    /// Sample std of daily spot moves, percent
    pub volatility_spot: f64,
    /// Sample std of daily futures moves within the run, percent
    pub volatility_future: f64,
    pub stress_type: StressType,
}

impl StressPeriod {
    pub fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Calm,
    InStress { start: usize },
}

/// Scan daily spot percentage changes for runs of extreme moves.
///
/// A day is extreme when `|Δ%| > threshold`. The first row has no change
/// and is never extreme. A run ends on the day before the first calm day;
/// a run still open at the last row is closed there. Runs shorter than
/// `min_consecutive_days` are discarded.
pub fn identify_stress_periods(points: &[PricePoint], config: &StressConfig) -> HedgeResult<Vec<StressPeriod>> {
    if points.is_empty() {
        return Err(HedgeError::EmptyInput(
            "no price data to scan for stress periods".into(),
        ));
    }
    config.validate()?;
    debug!(
        rows = points.len(),
        threshold = config.price_change_threshold,
        min_days = config.min_consecutive_days,
        "scanning for stress periods"
    );

    let spot: Vec<f64> = points.iter().map(|p| p.spot_price).collect();
    let changes = stats::pct_change(&spot);
    let is_extreme = |i: usize| {
        changes[i]
            .map(|c| c.abs() > config.price_change_threshold)
            .unwrap_or(false)
    };

    let mut runs: Vec<(usize, usize)> = Vec::new();
    let mut state = ScanState::Calm;
    for i in 0..points.len() {
        state = match (state, is_extreme(i)) {
            (ScanState::Calm, true) => ScanState::InStress { start: i },
            (ScanState::InStress { start }, false) => {
                runs.push((start, i - 1));
                ScanState::Calm
            }
            (unchanged, _) => unchanged,
        };
    }
    if let ScanState::InStress { start } = state {
        runs.push((start, points.len() - 1));
    }

    let periods: Vec<StressPeriod> = runs
        .into_iter()
        .filter(|(start, end)| end - start + 1 >= config.min_consecutive_days)
        .map(|(start, end)| summarize_run(points, &changes, start, end, config))
        .collect();

    info!(periods = periods.len(), "stress period scan complete");
    Ok(periods)
}

fn summarize_run(
    points: &[PricePoint],
    changes: &[Option<f64>],
    start: usize,
    end: usize,
    config: &StressConfig,
) -> StressPeriod {
    let rows = &points[start..=end];
    let (first, last) = (&rows[0], &rows[rows.len() - 1]);
    let duration_days = rows.len();

    let daily: Vec<f64> = changes[start..=end].iter().filter_map(|c| *c).collect();
    let abs_daily: Vec<f64> = daily.iter().map(|c| c.abs()).collect();

    let future_prices: Vec<f64> = rows.iter().map(|p| p.future_price).collect();
    let future_daily: Vec<f64> = stats::pct_change(&future_prices)
        .into_iter()
        .flatten()
        .collect();

    let spot_price_change_pct = (last.spot_price / first.spot_price - 1.0) * 100.0;

    StressPeriod {
        start_date: first.date,
        end_date: last.date,
        duration_days,
        start_index: start,
        end_index: end,
        spot_price_change: last.spot_price - first.spot_price,
        spot_price_change_pct,
        future_price_change: last.future_price - first.future_price,
        future_price_change_pct: (last.future_price / first.future_price - 1.0) * 100.0,
        max_daily_spot_change: stats::max(&abs_daily),
        avg_daily_spot_change: stats::mean(&abs_daily),
        volatility_spot: stats::sample_std(&daily),
        volatility_future: stats::sample_std(&future_daily),
        stress_type: StressType::classify(
            spot_price_change_pct,
            config.price_change_threshold,
            duration_days,
        ),
    }
}
