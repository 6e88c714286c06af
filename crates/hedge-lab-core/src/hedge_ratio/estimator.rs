use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};
use tracing::{debug, info, warn};

use crate::data::{AlignedSeries, PricePoint};
use crate::error::HedgeError;
use crate::stats;
use crate::types::Ratio;
use crate::HedgeResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which rows of the aligned series feed the estimate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationWindow {
    /// Every aligned row.
    #[default]
    All,
    /// The `n` most recent rows. Falls back to all rows when `n` is 0 or
    /// not smaller than the series length.
    Recent(usize),
}

impl EstimationWindow {
    pub fn from_size(size: Option<usize>) -> Self {
        match size {
            Some(n) if n > 0 => EstimationWindow::Recent(n),
            _ => EstimationWindow::All,
        }
    }

    pub fn select<'a>(&self, series: &'a AlignedSeries) -> &'a [PricePoint] {
        match self {
            EstimationWindow::All => series.points(),
            EstimationWindow::Recent(n) => series.tail(*n),
        }
    }
}

/// Fit statistics of the OLS regression Δspot = α + β·Δfuture + ε, plus the
/// correlation analysis of the two change series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionDiagnostics {
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub f_statistic: f64,
    pub f_pvalue: f64,
    pub intercept: f64,
    pub intercept_pvalue: f64,
    pub intercept_std_error: f64,
    pub slope: f64,
    pub slope_pvalue: f64,
    pub slope_std_error: f64,
    /// Pearson correlation of Δspot and Δfuture
    pub correlation: f64,
    /// Two-sided p-value of the correlation (t-test, n − 2 df)
    pub correlation_pvalue: f64,
    /// Sample standard deviation of Δspot
    pub spot_volatility: f64,
    /// Sample standard deviation of Δfuture
    pub future_volatility: f64,
    /// Number of difference rows used
    pub data_points: usize,
    pub window_used: EstimationWindow,
}

/// Output of [`estimate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeRatioEstimate {
    /// Minimum-variance ratio Cov(Δs, Δf) / Var(Δf); the recommended value
    pub optimal_hedge_ratio: Ratio,
    /// OLS slope (with intercept), informational
    pub hedge_ratio_ols: Ratio,
    /// ρ · σs / σf, informational
    pub hedge_ratio_corr: Ratio,
    pub calculation_method: String,
    /// Number of difference rows used
    pub data_points: usize,
    pub window_used: EstimationWindow,
    pub diagnostics: RegressionDiagnostics,
}

/// Day-over-day price differences with the undefined first row removed.
#[derive(Debug, Clone)]
pub(crate) struct PriceChanges {
    pub spot: Vec<f64>,
    pub future: Vec<f64>,
}

impl PriceChanges {
    pub fn from_points(points: &[PricePoint]) -> HedgeResult<Self> {
        let spot_prices: Vec<f64> = points.iter().map(|p| p.spot_price).collect();
        let future_prices: Vec<f64> = points.iter().map(|p| p.future_price).collect();
        let changes = PriceChanges {
            spot: stats::diff(&spot_prices),
            future: stats::diff(&future_prices),
        };
        if changes.len() < MIN_CHANGE_ROWS {
            return Err(HedgeError::InsufficientData(format!(
                "need at least {} data points after differencing (got {} from {} prices)",
                MIN_CHANGE_ROWS,
                changes.len(),
                points.len()
            )));
        }
        Ok(changes)
    }

    pub fn len(&self) -> usize {
        self.spot.len()
    }

    /// Δspot − ratio · Δfuture
    pub fn hedged(&self, ratio: Ratio) -> Vec<f64> {
        self.spot
            .iter()
            .zip(self.future.iter())
            .map(|(s, f)| s - ratio * f)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MIN_CHANGE_ROWS: usize = 2;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Estimate the optimal hedge ratio from price differences.
///
/// The minimum-variance ratio is reported as the primary value. The OLS
/// slope and the correlation-scaled ratio are computed alongside as
/// cross-checks, together with the regression's inferential statistics.
pub fn estimate(series: &AlignedSeries, window: EstimationWindow) -> HedgeResult<HedgeRatioEstimate> {
    let points = window.select(series);
    debug!(rows = points.len(), ?window, "estimating hedge ratio");
    let changes = PriceChanges::from_points(points)?;
    let n = changes.len();

    // -- Minimum variance: sample covariance matrix entries --
    let cov_sf = stats::sample_covariance(&changes.spot, &changes.future);
    let var_f = stats::sample_variance(&changes.future);
    let optimal_hedge_ratio = cov_sf / var_f;

    // -- OLS with intercept --
    let fit = ols_with_intercept(&changes.future, &changes.spot);

    // -- Correlation-scaled ratio --
    let correlation = stats::correlation(&changes.spot, &changes.future);
    let spot_volatility = stats::sample_std(&changes.spot);
    let future_volatility = stats::sample_std(&changes.future);
    let hedge_ratio_corr = correlation * (spot_volatility / future_volatility);
    let correlation_pvalue = correlation_pvalue(correlation, n);

    if !optimal_hedge_ratio.is_finite() {
        warn!(
            ratio = optimal_hedge_ratio,
            future_variance = var_f,
            "minimum-variance hedge ratio is undefined"
        );
    }
    info!(
        ratio = optimal_hedge_ratio,
        ols = fit.slope,
        r_squared = fit.r_squared,
        data_points = n,
        "hedge ratio estimated"
    );

    Ok(HedgeRatioEstimate {
        optimal_hedge_ratio,
        hedge_ratio_ols: fit.slope,
        hedge_ratio_corr,
        calculation_method: "minimum_variance".into(),
        data_points: n,
        window_used: window,
        diagnostics: RegressionDiagnostics {
            r_squared: fit.r_squared,
            adj_r_squared: fit.adj_r_squared,
            f_statistic: fit.f_statistic,
            f_pvalue: fit.f_pvalue,
            intercept: fit.intercept,
            intercept_pvalue: fit.intercept_pvalue,
            intercept_std_error: fit.intercept_std_error,
            slope: fit.slope,
            slope_pvalue: fit.slope_pvalue,
            slope_std_error: fit.slope_std_error,
            correlation,
            correlation_pvalue,
            spot_volatility,
            future_volatility,
            data_points: n,
            window_used: window,
        },
    })
}

// ---------------------------------------------------------------------------
// Regression internals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct OlsFit {
    intercept: f64,
    slope: f64,
    intercept_std_error: f64,
    slope_std_error: f64,
    intercept_pvalue: f64,
    slope_pvalue: f64,
    r_squared: f64,
    adj_r_squared: f64,
    f_statistic: f64,
    f_pvalue: f64,
}

/// Simple linear regression y = α + βx with classical standard errors.
fn ols_with_intercept(x: &[f64], y: &[f64]) -> OlsFit {
    let n = x.len() as f64;
    let mx = stats::mean(x);
    let my = stats::mean(y);

    let sxx: f64 = x.iter().map(|v| (v - mx) * (v - mx)).sum();
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    let sst: f64 = y.iter().map(|v| (v - my) * (v - my)).sum();

    let slope = sxy / sxx;
    let intercept = my - slope * mx;
    let sse: f64 = x
        .iter()
        .zip(y)
        .map(|(a, b)| {
            let e = b - (intercept + slope * a);
            e * e
        })
        .sum();

    let df_resid = n - 2.0;
    let sigma2 = sse / df_resid;
    let slope_std_error = (sigma2 / sxx).sqrt();
    let intercept_std_error = (sigma2 * (1.0 / n + mx * mx / sxx)).sqrt();

    let r_squared = 1.0 - sse / sst;
    let adj_r_squared = 1.0 - (1.0 - r_squared) * (n - 1.0) / df_resid;
    let f_statistic = (sst - sse) / sigma2;

    OlsFit {
        intercept,
        slope,
        intercept_std_error,
        slope_std_error,
        intercept_pvalue: two_sided_t_pvalue(intercept / intercept_std_error, df_resid),
        slope_pvalue: two_sided_t_pvalue(slope / slope_std_error, df_resid),
        r_squared,
        adj_r_squared,
        f_statistic,
        f_pvalue: f_test_pvalue(f_statistic, 1.0, df_resid),
    }
}

fn two_sided_t_pvalue(t: f64, df: f64) -> f64 {
    if t.is_nan() || df.is_nan() || df <= 0.0 {
        return f64::NAN;
    }
    if t.is_infinite() {
        return 0.0;
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => 2.0 * dist.sf(t.abs()),
        Err(_) => f64::NAN,
    }
}

fn f_test_pvalue(f: f64, df1: f64, df2: f64) -> f64 {
    if f.is_nan() || df2.is_nan() || df2 <= 0.0 {
        return f64::NAN;
    }
    if f.is_infinite() {
        return 0.0;
    }
    if f <= 0.0 {
        return 1.0;
    }
    match FisherSnedecor::new(df1, df2) {
        Ok(dist) => dist.sf(f),
        Err(_) => f64::NAN,
    }
}

/// Two-sided p-value of a Pearson correlation under H0: ρ = 0.
fn correlation_pvalue(r: f64, n: usize) -> f64 {
    if r.is_nan() || n < 3 {
        return f64::NAN;
    }
    let df = (n - 2) as f64;
    let denom = 1.0 - r * r;
    if denom <= 0.0 {
        return 0.0;
    }
    two_sided_t_pvalue(r * (df / denom).sqrt(), df)
}
