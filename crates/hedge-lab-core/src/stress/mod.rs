pub mod detector;
pub mod export;
pub mod tester;

pub use detector::{
    identify_stress_periods, StressConfig, StressPeriod, StressType,
    DEFAULT_MIN_CONSECUTIVE_DAYS, DEFAULT_PRICE_CHANGE_THRESHOLD, STRESS_CLASSIFICATION_FACTOR,
};
pub use export::{read_stress_csv, stress_csv_rows, write_stress_csv, StressCsvRow};
pub use tester::{
    run_stress_test, PeriodInfo, PeriodKind, PeriodPerformance, StressSelection, StressSummary,
    StressTestResult, StressTestType,
};
