use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::HedgeError;
use crate::types::Ratio;
use crate::HedgeResult;

/// Ratios above this magnitude are rejected outright.
const MAX_PLAUSIBLE_RATIO: f64 = 10.0;
/// Ratios above this magnitude are accepted with a caution.
const LARGE_RATIO: f64 = 5.0;
/// Ratios below this magnitude hedge almost nothing.
const NEGLIGIBLE_RATIO: f64 = 0.01;

/// Plausibility verdict for a hedge ratio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatioValidation {
    pub is_valid: bool,
    pub message: String,
}

impl RatioValidation {
    fn new(is_valid: bool, message: impl Into<String>) -> Self {
        RatioValidation {
            is_valid,
            message: message.into(),
        }
    }
}

/// Judge whether a hedge ratio is usable.
pub fn validate_hedge_ratio(ratio: Ratio) -> RatioValidation {
    if ratio.is_nan() {
        return RatioValidation::new(false, "hedge ratio is not a number (NaN)");
    }
    if ratio.is_infinite() {
        return RatioValidation::new(false, "hedge ratio is infinite");
    }
    let magnitude = ratio.abs();
    if magnitude > MAX_PLAUSIBLE_RATIO {
        return RatioValidation::new(
            false,
            format!("hedge ratio is too large ({:.4}), check the input data", ratio),
        );
    }
    if magnitude < NEGLIGIBLE_RATIO {
        return RatioValidation::new(true, "hedge ratio is very small, the hedge effect may be limited");
    }
    if magnitude > LARGE_RATIO {
        return RatioValidation::new(
            true,
            "hedge ratio is large, confirm the futures contract matches the spot commodity",
        );
    }
    RatioValidation::new(true, "hedge ratio is reasonable")
}

/// Futures position needed to hedge a spot quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeQuantity {
    pub spot_quantity: f64,
    pub optimal_hedge_ratio: Ratio,
    pub future_quantity_needed: f64,
    pub future_contract_size: f64,
    pub contract_count: f64,
    /// Contract count rounded half-to-even
    pub rounded_contract_count: f64,
    /// Ratio actually achieved with the rounded contract count
    pub actual_hedge_ratio: Ratio,
}

/// Translate a hedge ratio into a whole number of futures contracts.
pub fn hedge_quantity(
    spot_quantity: f64,
    hedge_ratio: Ratio,
    contract_size: f64,
) -> HedgeResult<HedgeQuantity> {
    if !contract_size.is_finite() || contract_size <= 0.0 {
        return Err(HedgeError::InvalidInput {
            field: "future_contract_size".into(),
            reason: format!("must be positive (got {})", contract_size),
        });
    }
    let future_quantity_needed = spot_quantity * hedge_ratio;
    let contract_count = future_quantity_needed / contract_size;
    let rounded_contract_count = contract_count.round_ties_even();
    if spot_quantity == 0.0 {
        warn!("spot quantity is zero; actual hedge ratio is undefined");
    }
    Ok(HedgeQuantity {
        spot_quantity,
        optimal_hedge_ratio: hedge_ratio,
        future_quantity_needed,
        future_contract_size: contract_size,
        contract_count,
        rounded_contract_count,
        actual_hedge_ratio: rounded_contract_count * contract_size / spot_quantity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_bands() {
        assert!(!validate_hedge_ratio(f64::NAN).is_valid);
        assert!(!validate_hedge_ratio(f64::INFINITY).is_valid);
        assert!(!validate_hedge_ratio(-12.0).is_valid);
        let tiny = validate_hedge_ratio(0.005);
        assert!(tiny.is_valid);
        assert!(tiny.message.contains("limited"));
        let large = validate_hedge_ratio(7.5);
        assert!(large.is_valid);
        assert!(large.message.contains("confirm"));
        assert_eq!(
            validate_hedge_ratio(0.9),
            RatioValidation::new(true, "hedge ratio is reasonable")
        );
    }

    #[test]
    fn test_boundaries_are_exclusive() {
        assert!(validate_hedge_ratio(10.0).is_valid);
        assert!(validate_hedge_ratio(0.01).message.contains("reasonable"));
        assert!(validate_hedge_ratio(5.0).message.contains("reasonable"));
    }

    #[test]
    fn test_hedge_quantity_rounding() {
        let q = hedge_quantity(34.0, 0.5, 2.0).unwrap();
        assert_eq!(q.future_quantity_needed, 17.0);
        assert_eq!(q.contract_count, 8.5);
        // Half rounds to the even neighbour.
        assert_eq!(q.rounded_contract_count, 8.0);
        assert!((q.actual_hedge_ratio - 16.0 / 34.0).abs() < 1e-12);

        let q = hedge_quantity(38.0, 0.5, 2.0).unwrap();
        assert_eq!(q.contract_count, 9.5);
        assert_eq!(q.rounded_contract_count, 10.0);
    }

    #[test]
    fn test_non_positive_contract_size_rejected() {
        for size in [0.0, -5.0, f64::NAN] {
            assert!(matches!(
                hedge_quantity(100.0, 1.0, size),
                Err(HedgeError::InvalidInput { .. })
            ));
        }
    }
}
