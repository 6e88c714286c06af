pub mod analysis;
pub mod metrics;
pub mod simulator;

pub use analysis::{
    format_fixed, format_percent, performance_summary, period_analysis, rolling_metrics,
    PerformanceSummary, PeriodAnalysis, PeriodMetrics, RollingMetricsRow, SummaryItem,
    SummarySection, DEFAULT_ROLLING_WINDOW,
};
pub use metrics::{
    compute_metrics, count_profitable, sharpe_ratio, PerformanceMetrics, HEDGE_COST_RATE,
    VAR_PERCENTILE,
};
pub use simulator::{
    run_backtest, BacktestParameters, BacktestRecord, BacktestResult, DirectionSigns,
    HedgeDirection, HedgeParameters,
};
