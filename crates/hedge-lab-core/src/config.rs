use serde::{Deserialize, Serialize};

use crate::backtest::{BacktestParameters, HedgeDirection, DEFAULT_ROLLING_WINDOW};
use crate::data::MissingValuePolicy;
use crate::error::HedgeError;
use crate::hedge_ratio::{EstimationWindow, DEFAULT_SENSITIVITY_RANGE, DEFAULT_SENSITIVITY_STEPS};
use crate::stress::StressConfig;
use crate::types::Ratio;
use crate::HedgeResult;

/// Every tunable of an analysis run. Missing fields take their defaults,
/// so a partial JSON/YAML document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub missing_value_policy: MissingValuePolicy,
    pub window: EstimationWindow,
    pub spot_quantity: f64,
    pub hedge_direction: HedgeDirection,
    pub future_contract_size: f64,
    pub sensitivity_range: f64,
    pub sensitivity_steps: usize,
    pub rolling_window: usize,
    pub stress: StressConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            missing_value_policy: MissingValuePolicy::Drop,
            window: EstimationWindow::All,
            spot_quantity: 100.0,
            hedge_direction: HedgeDirection::ShortHedge,
            future_contract_size: 1.0,
            sensitivity_range: DEFAULT_SENSITIVITY_RANGE,
            sensitivity_steps: DEFAULT_SENSITIVITY_STEPS,
            rolling_window: DEFAULT_ROLLING_WINDOW,
            stress: StressConfig::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_json(text: &str) -> HedgeResult<Self> {
        let config: AnalysisConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> HedgeResult<()> {
        if !self.spot_quantity.is_finite() {
            return Err(invalid("spot_quantity", "must be a finite number"));
        }
        if !self.future_contract_size.is_finite() || self.future_contract_size <= 0.0 {
            return Err(invalid("future_contract_size", "must be positive"));
        }
        if !self.sensitivity_range.is_finite() || self.sensitivity_range < 0.0 {
            return Err(invalid("sensitivity_range", "must be a non-negative fraction"));
        }
        if self.sensitivity_steps == 0 {
            return Err(invalid("sensitivity_steps", "must be at least 1"));
        }
        if self.rolling_window < 2 {
            return Err(invalid("rolling_window", "must be at least 2"));
        }
        self.stress.validate()
    }

    pub fn backtest_parameters(&self, hedge_ratio: Ratio) -> BacktestParameters {
        BacktestParameters {
            hedge_ratio,
            spot_quantity: self.spot_quantity,
            hedge_direction: self.hedge_direction,
            future_contract_size: self.future_contract_size,
        }
    }
}

fn invalid(field: &str, reason: &str) -> HedgeError {
    HedgeError::InvalidInput {
        field: field.into(),
        reason: reason.into(),
    }
}
