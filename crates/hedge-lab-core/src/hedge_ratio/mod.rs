pub mod effectiveness;
pub mod estimator;
pub mod sizing;

pub use effectiveness::{
    effectiveness, sensitivity, sensitivity_table, HedgeEffectiveness, SensitivityRow,
    SensitivitySweep, DEFAULT_SENSITIVITY_RANGE, DEFAULT_SENSITIVITY_STEPS,
};
pub use estimator::{estimate, EstimationWindow, HedgeRatioEstimate, RegressionDiagnostics};
pub use sizing::{hedge_quantity, validate_hedge_ratio, HedgeQuantity, RatioValidation};
