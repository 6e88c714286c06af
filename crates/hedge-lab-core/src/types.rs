use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Prices in quote currency per unit. Never negative once validated.
pub type Price = f64;

/// Profit and loss in quote currency.
pub type Pnl = f64;

/// Hedge ratio: futures units per unit of spot exposure.
pub type Ratio = f64;

/// Rates expressed as decimals (0.05 = 5%) unless a field name ends in `_pct`.
pub type Rate = f64;

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// An inverted range contains no dates.
    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "ieee754_f64".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let range = DateRange::new(d(2024, 1, 2), d(2024, 1, 5));
        assert!(range.contains(d(2024, 1, 2)));
        assert!(range.contains(d(2024, 1, 5)));
        assert!(!range.contains(d(2024, 1, 6)));
        assert!(!range.is_inverted());
    }

    #[test]
    fn test_inverted_range_contains_nothing() {
        let range = DateRange::new(d(2024, 1, 5), d(2024, 1, 2));
        assert!(range.is_inverted());
        assert!(!range.contains(d(2024, 1, 3)));
    }

    #[test]
    fn test_with_metadata_envelope() {
        let out = with_metadata(
            "Minimum Variance Hedge Ratio",
            &serde_json::json!({ "window": "all_data" }),
            vec!["check data".into()],
            12,
            1.5_f64,
        );
        assert_eq!(out.result, 1.5);
        assert_eq!(out.metadata.precision, "ieee754_f64");
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.assumptions["window"], "all_data");
    }
}
