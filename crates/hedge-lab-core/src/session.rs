use chrono::NaiveDate;
use tracing::debug;

use crate::backtest::{
    self, BacktestParameters, BacktestResult, PerformanceSummary, PeriodAnalysis, RollingMetricsRow,
};
use crate::data::{AlignedSeries, PricePoint};
use crate::error::HedgeError;
use crate::stress::{self, StressConfig, StressPeriod, StressSelection, StressTestResult};
use crate::HedgeResult;

/// Per-caller analysis context.
///
/// Holds the most recent backtest, the most recently detected stress
/// periods and the most recent stress test, so follow-up queries need not
/// pass them around. The free functions remain the primary API; a session
/// only remembers their outputs.
#[derive(Debug, Clone, Default)]
pub struct HedgeSession {
    backtest: Option<BacktestResult>,
    stress_periods: Option<Vec<StressPeriod>>,
    stress_config: StressConfig,
    stress_result: Option<StressTestResult>,
}

impl HedgeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stress_config(config: StressConfig) -> Self {
        HedgeSession {
            stress_config: config,
            ..Self::default()
        }
    }

    pub fn last_backtest(&self) -> Option<&BacktestResult> {
        self.backtest.as_ref()
    }

    pub fn stress_periods(&self) -> Option<&[StressPeriod]> {
        self.stress_periods.as_deref()
    }

    pub fn stress_config(&self) -> &StressConfig {
        &self.stress_config
    }

    pub fn last_stress_result(&self) -> Option<&StressTestResult> {
        self.stress_result.as_ref()
    }

    fn require_backtest(&self) -> HedgeResult<&BacktestResult> {
        self.backtest
            .as_ref()
            .ok_or_else(|| HedgeError::InvalidState("no backtest has been run in this session".into()))
    }

    /// Run a backtest and keep it as the session's current result.
    pub fn run_backtest(&mut self, series: &AlignedSeries, params: &BacktestParameters) -> HedgeResult<&BacktestResult> {
        let result = backtest::run_backtest(series, params)?;
        Ok(self.backtest.insert(result))
    }

    pub fn period_analysis(&self, start: NaiveDate, end: NaiveDate) -> HedgeResult<PeriodAnalysis> {
        backtest::period_analysis(self.require_backtest()?, start, end)
    }

    pub fn rolling_metrics(&self, window: usize) -> HedgeResult<Vec<RollingMetricsRow>> {
        backtest::rolling_metrics(self.require_backtest()?, window)
    }

    pub fn performance_summary(&self) -> HedgeResult<PerformanceSummary> {
        Ok(backtest::performance_summary(self.require_backtest()?))
    }

    /// Detect stress periods and remember both them and the thresholds used.
    pub fn identify_stress_periods(
        &mut self,
        points: &[PricePoint],
        config: StressConfig,
    ) -> HedgeResult<&[StressPeriod]> {
        let periods = stress::identify_stress_periods(points, &config)?;
        self.stress_config = config;
        Ok(self.stress_periods.insert(periods).as_slice())
    }

    /// Stress-test the current backtest.
    ///
    /// `AutoDetect` reuses periods stored by [`identify_stress_periods`]
    /// when there are any. Otherwise it detects on the backtest's price rows
    /// with the stored thresholds and keeps what it found.
    ///
    /// [`identify_stress_periods`]: HedgeSession::identify_stress_periods
    pub fn run_stress_test(&mut self, selection: &StressSelection) -> HedgeResult<&StressTestResult> {
        let needs_detection = matches!(selection, StressSelection::AutoDetect)
            && self.stress_periods.as_ref().map_or(true, |p| p.is_empty());
        if needs_detection {
            let points = self.require_backtest()?.price_points();
            let detected = stress::identify_stress_periods(&points, &self.stress_config)?;
            debug!(periods = detected.len(), "stress periods detected for the session");
            self.stress_periods = Some(detected);
        }

        let backtest = self.require_backtest()?;
        let result = match (selection, &self.stress_periods) {
            (StressSelection::AutoDetect, Some(stored)) => {
                debug!(periods = stored.len(), "scoring stored stress periods");
                stress::run_stress_test(
                    backtest,
                    &StressSelection::Periods(stored.clone()),
                    &self.stress_config,
                )?
            }
            _ => stress::run_stress_test(backtest, selection, &self.stress_config)?,
        };
        Ok(self.stress_result.insert(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::HedgeDirection;
    use crate::stress::StressTestType;

    fn series() -> AlignedSeries {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let spot = [100.0, 100.2, 110.0, 121.0, 133.0, 133.4, 133.1, 133.6, 133.3];
        AlignedSeries::new(
            spot.iter()
                .enumerate()
                .map(|(i, s)| PricePoint {
                    date: start + chrono::Duration::days(i as i64),
                    spot_price: *s,
                    future_price: s * 0.95,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_queries_before_backtest_are_invalid_state() {
        let mut session = HedgeSession::new();
        let d = NaiveDate::from_ymd_opt(2024, 2, 3).unwrap();
        assert!(matches!(session.period_analysis(d, d), Err(HedgeError::InvalidState(_))));
        assert!(matches!(session.rolling_metrics(5), Err(HedgeError::InvalidState(_))));
        assert!(matches!(session.performance_summary(), Err(HedgeError::InvalidState(_))));
        assert!(matches!(
            session.run_stress_test(&StressSelection::AutoDetect),
            Err(HedgeError::InvalidState(_))
        ));
    }

    #[test]
    fn test_backtest_is_remembered() {
        let mut session = HedgeSession::new();
        let days = session
            .run_backtest(&series(), &BacktestParameters::new(1.0, 10.0, HedgeDirection::ShortHedge))
            .unwrap()
            .metrics
            .total_days;
        assert_eq!(days, 8);
        assert!(session.last_backtest().is_some());
        assert_eq!(session.rolling_metrics(3).unwrap().len(), 8);
        assert!(session.performance_summary().is_ok());
    }

    #[test]
    fn test_auto_detect_reuses_stored_periods() {
        let s = series();
        let mut session = HedgeSession::new();
        session
            .run_backtest(&s, &BacktestParameters::new(1.0, 10.0, HedgeDirection::ShortHedge))
            .unwrap();
        let found = session
            .identify_stress_periods(s.points(), StressConfig::default())
            .unwrap()
            .len();
        assert_eq!(found, 1);
        // Stored periods came from the aligned series; date slicing still
        // lines them up with the backtest records.
        let result = session.run_stress_test(&StressSelection::AutoDetect).unwrap();
        assert_eq!(result.test_type, StressTestType::IdentifiedPeriods);
        assert_eq!(result.stress_periods.len(), 1);
        assert_eq!(result.stress_periods[0].days, 3);
        assert!(session.last_stress_result().is_some());
    }

    #[test]
    fn test_auto_detect_keeps_detected_periods() {
        let mut session = HedgeSession::new();
        session
            .run_backtest(&series(), &BacktestParameters::new(1.0, 10.0, HedgeDirection::ShortHedge))
            .unwrap();
        assert!(session.stress_periods().is_none());

        let tested = session
            .run_stress_test(&StressSelection::AutoDetect)
            .unwrap()
            .stress_periods
            .len();
        assert_eq!(tested, 1);

        let stored = session.stress_periods().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].start_date, NaiveDate::from_ymd_opt(2024, 2, 3).unwrap());
        assert_eq!(stored[0].duration_days, 3);
    }
}
