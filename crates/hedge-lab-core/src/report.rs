use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::backtest::{format_fixed, format_percent, performance_summary, BacktestResult};
use crate::stress::StressTestResult;

/// Qualitative reading of a stress-period effectiveness score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressVerdict {
    Good,
    Moderate,
    Poor,
}

impl StressVerdict {
    /// `> 0.5` good, `> 0.2` moderate, anything else (NaN included) poor.
    pub fn from_effectiveness(effectiveness: f64) -> Self {
        if effectiveness > 0.5 {
            StressVerdict::Good
        } else if effectiveness > 0.2 {
            StressVerdict::Moderate
        } else {
            StressVerdict::Poor
        }
    }

    fn lines(self) -> [&'static str; 3] {
        match self {
            StressVerdict::Good => [
                "**The hedge held up well during stress periods.**",
                "- Hedging materially reduced risk in extreme markets.",
                "- Keep the current hedge strategy.",
            ],
            StressVerdict::Moderate => [
                "**The hedge was moderately effective during stress periods.**",
                "- Hedging reduced some risk, but only partially.",
                "- Consider re-tuning the hedge ratio or adding other risk tools.",
            ],
            StressVerdict::Poor => [
                "**The hedge performed poorly during stress periods.**",
                "- Hedging did not contain extreme-market risk.",
                "- Re-evaluate the hedge strategy and risk management approach.",
            ],
        }
    }
}

/// Markdown report of a stress test: overview, per-period details, the
/// normal-period comparison and a conclusion.
pub fn render_stress_report(result: &StressTestResult) -> String {
    let mut out: Vec<String> = vec!["## Stress Test Report".into(), String::new()];

    if let Some(summary) = &result.summary {
        out.push("### Overview".into());
        out.push(format!("- Stress periods tested: {}", summary.total_stress_periods));
        out.push(format!("- Total stress days: {}", summary.total_stress_days));
        out.push(format!(
            "- Hedged P&L in stress periods: {}",
            format_fixed(summary.total_stress_pnl_hedged, 2)
        ));
        out.push(format!(
            "- Unhedged P&L in stress periods: {}",
            format_fixed(summary.total_stress_pnl_unhedged, 2)
        ));
        out.push(format!(
            "- Stress-period hedge effectiveness: {}",
            format_percent(summary.stress_effectiveness)
        ));
        out.push(String::new());
    }

    if !result.stress_periods.is_empty() {
        out.push("### Period Details".into());
        for (i, period) in result.stress_periods.iter().enumerate() {
            let info = &period.period_info;
            out.push(format!("**Period {}: {}**", i + 1, info.kind));
            out.push(format!("- Dates: {} to {}", info.start_date, info.end_date));
            out.push(format!("- Duration: {} days", info.duration_days));
            out.push(format!("- Hedged P&L: {}", format_fixed(period.total_hedged_pnl, 2)));
            out.push(format!("- Unhedged P&L: {}", format_fixed(period.total_unhedged_pnl, 2)));
            out.push(format!("- Hedge advantage: {}", format_fixed(period.hedge_advantage, 2)));
            out.push(format!(
                "- Worst day (hedged): {}",
                format_fixed(period.max_daily_loss_hedged, 2)
            ));
            out.push(format!(
                "- Worst day (unhedged): {}",
                format_fixed(period.max_daily_loss_unhedged, 2)
            ));
            out.push(String::new());
        }
    }

    let normal = &result.normal_period_comparison;
    out.push("### Normal Period Comparison".into());
    out.push(format!("- Normal days: {}", normal.days));
    out.push(format!("- Hedged P&L: {}", format_fixed(normal.total_hedged_pnl, 2)));
    out.push(format!("- Unhedged P&L: {}", format_fixed(normal.total_unhedged_pnl, 2)));
    out.push(String::new());

    out.push("### Conclusion".into());
    let effectiveness = result
        .summary
        .as_ref()
        .map(|s| s.stress_effectiveness)
        .unwrap_or(0.0);
    out.extend(
        StressVerdict::from_effectiveness(effectiveness)
            .lines()
            .iter()
            .map(|l| l.to_string()),
    );

    out.join("\n")
}

/// Full Markdown analysis: parameters, the performance summary sections
/// and, when given, the stress report.
pub fn render_analysis_report(
    backtest: &BacktestResult,
    stress: Option<&StressTestResult>,
    symbol: Option<&str>,
    generated_at: NaiveDateTime,
) -> String {
    let params = &backtest.parameters;
    let mut out: Vec<String> = vec![
        "# Futures Hedge Analysis Report".into(),
        String::new(),
        format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S")),
        String::new(),
        "## Parameters".into(),
        String::new(),
        format!("- Hedge direction: {}", params.hedge_direction.describe()),
        format!("- Spot quantity: {}", format_fixed(params.spot_quantity, 2)),
        format!("- Hedge ratio: {}", format_fixed(params.hedge_ratio, 4)),
    ];
    if let Some(symbol) = symbol {
        out.push(format!("- Futures contract: {}", symbol));
    }
    out.push(String::new());

    out.push("## Performance Summary".into());
    out.push(String::new());
    for section in performance_summary(backtest).sections {
        out.push(format!("### {}", section.title));
        out.push(String::new());
        for item in section.items {
            out.push(format!("- {}: {}", item.label, item.value));
        }
        out.push(String::new());
    }

    if let Some(stress) = stress {
        out.push(render_stress_report(stress));
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::{run_backtest, BacktestParameters, HedgeDirection};
    use crate::data::{AlignedSeries, PricePoint};
    use crate::stress::{run_stress_test, StressConfig, StressSelection};
    use chrono::NaiveDate;

    fn fixtures() -> (BacktestResult, StressTestResult) {
        let start = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();
        let spot = [100.0, 100.4, 110.0, 121.0, 133.0, 133.5, 133.2, 133.9];
        let series = AlignedSeries::new(
            spot.iter()
                .enumerate()
                .map(|(i, s)| PricePoint {
                    date: start + chrono::Duration::days(i as i64),
                    spot_price: *s,
                    future_price: s * 0.98,
                })
                .collect(),
        )
        .unwrap();
        let bt = run_backtest(&series, &BacktestParameters::new(1.0, 50.0, HedgeDirection::ShortHedge)).unwrap();
        let stress = run_stress_test(&bt, &StressSelection::AutoDetect, &StressConfig::default()).unwrap();
        (bt, stress)
    }

    #[test]
    fn test_verdict_bands() {
        assert_eq!(StressVerdict::from_effectiveness(0.8), StressVerdict::Good);
        assert_eq!(StressVerdict::from_effectiveness(0.5), StressVerdict::Moderate);
        assert_eq!(StressVerdict::from_effectiveness(0.3), StressVerdict::Moderate);
        assert_eq!(StressVerdict::from_effectiveness(0.2), StressVerdict::Poor);
        assert_eq!(StressVerdict::from_effectiveness(f64::NAN), StressVerdict::Poor);
    }

    #[test]
    fn test_stress_report_sections() {
        let (_, stress) = fixtures();
        let report = render_stress_report(&stress);
        assert!(report.starts_with("## Stress Test Report"));
        assert!(report.contains("### Overview"));
        assert!(report.contains("**Period 1: Sharp rally**"));
        assert!(report.contains("### Normal Period Comparison"));
        assert!(report.contains("held up well"));
    }

    #[test]
    fn test_analysis_report_includes_parameters_and_summary() {
        let (bt, stress) = fixtures();
        let at = NaiveDate::from_ymd_opt(2024, 9, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        let report = render_analysis_report(&bt, Some(&stress), Some("CU2409"), at);
        assert!(report.contains("Generated: 2024-09-01 12:30:00"));
        assert!(report.contains("- Futures contract: CU2409"));
        assert!(report.contains("- Hedge ratio: 1.0000"));
        assert!(report.contains("### Risk control"));
        assert!(report.contains("## Stress Test Report"));

        let bare = render_analysis_report(&bt, None, None, at);
        assert!(!bare.contains("Stress Test Report"));
        assert!(!bare.contains("Futures contract"));
    }
}
