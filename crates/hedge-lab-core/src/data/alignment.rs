use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, info};

use super::series::{Observation, PriceSeries};
use crate::error::HedgeError;
use crate::stats;
use crate::types::{DateRange, Price};
use crate::HedgeResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One trading day with both a spot and a futures price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub spot_price: Price,
    pub future_price: Price,
}

/// Spot and futures prices inner-joined on date.
///
/// Always non-empty, strictly increasing in date, with finite non-negative
/// prices. Deserialization goes through the same checks as [`AlignedSeries::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PricePoint>", into = "Vec<PricePoint>")]
pub struct AlignedSeries {
    points: Vec<PricePoint>,
}

/// Descriptive statistics for one price column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceColumnStats {
    pub mean: Price,
    pub std_dev: Price,
    pub min: Price,
    pub max: Price,
    /// std_dev / mean × 100
    pub coefficient_of_variation_pct: f64,
}

/// Read-only summary of an aligned series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSummary {
    pub rows: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub spot: PriceColumnStats,
    pub future: PriceColumnStats,
}

// ---------------------------------------------------------------------------
// AlignedSeries
// ---------------------------------------------------------------------------

impl AlignedSeries {
    pub fn new(points: Vec<PricePoint>) -> HedgeResult<Self> {
        if points.is_empty() {
            return Err(HedgeError::EmptyInput(
                "aligned series needs at least one dated price pair".into(),
            ));
        }
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(HedgeError::InvalidInput {
                    field: "date".into(),
                    reason: format!(
                        "dates must be strictly increasing ({} follows {})",
                        pair[1].date, pair[0].date
                    ),
                });
            }
        }
        for p in &points {
            for (field, price) in [("spot_price", p.spot_price), ("future_price", p.future_price)] {
                if !price.is_finite() || price < 0.0 {
                    return Err(HedgeError::InvalidInput {
                        field: field.into(),
                        reason: format!("{} on {} must be finite and non-negative", price, p.date),
                    });
                }
            }
        }
        Ok(AlignedSeries { points })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn date_range(&self) -> DateRange {
        DateRange::new(self.points[0].date, self.points[self.points.len() - 1].date)
    }

    pub fn spot_prices(&self) -> Vec<Price> {
        self.points.iter().map(|p| p.spot_price).collect()
    }

    pub fn future_prices(&self) -> Vec<Price> {
        self.points.iter().map(|p| p.future_price).collect()
    }

    /// The `n` most recent points; the whole series when `n` is 0 or
    /// at least the series length.
    pub fn tail(&self, n: usize) -> &[PricePoint] {
        if n == 0 || n >= self.points.len() {
            &self.points
        } else {
            &self.points[self.points.len() - n..]
        }
    }

    /// The spot column as a standalone series.
    pub fn spot_series(&self) -> PriceSeries {
        self.column("spot_price", |p| p.spot_price)
    }

    /// The futures column as a standalone series.
    pub fn future_series(&self) -> PriceSeries {
        self.column("future_price", |p| p.future_price)
    }

    fn column(&self, name: &str, pick: impl Fn(&PricePoint) -> Price) -> PriceSeries {
        let observations = self
            .points
            .iter()
            .map(|p| Observation {
                date: p.date,
                price: pick(p),
            })
            .collect();
        PriceSeries::from_validated(name, observations)
    }
}

impl TryFrom<Vec<PricePoint>> for AlignedSeries {
    type Error = HedgeError;

    fn try_from(points: Vec<PricePoint>) -> Result<Self, Self::Error> {
        AlignedSeries::new(points)
    }
}

impl From<AlignedSeries> for Vec<PricePoint> {
    fn from(series: AlignedSeries) -> Self {
        series.points
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Inner-join a spot and a futures series on date.
pub fn align(spot: &PriceSeries, future: &PriceSeries) -> HedgeResult<AlignedSeries> {
    if spot.is_empty() {
        return Err(HedgeError::EmptyInput("spot series has no rows".into()));
    }
    if future.is_empty() {
        return Err(HedgeError::EmptyInput("futures series has no rows".into()));
    }

    let s = spot.observations();
    let f = future.observations();
    let mut points = Vec::with_capacity(s.len().min(f.len()));
    let (mut i, mut j) = (0usize, 0usize);
    while i < s.len() && j < f.len() {
        match s[i].date.cmp(&f[j].date) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                points.push(PricePoint {
                    date: s[i].date,
                    spot_price: s[i].price,
                    future_price: f[j].price,
                });
                i += 1;
                j += 1;
            }
        }
    }

    if points.is_empty() {
        return Err(HedgeError::EmptyInput(
            "spot and futures series have no overlapping dates".into(),
        ));
    }

    debug!(
        spot_rows = s.len(),
        future_rows = f.len(),
        aligned_rows = points.len(),
        "aligned spot and futures series"
    );
    let aligned = AlignedSeries::new(points)?;
    info!(
        rows = aligned.len(),
        start = %aligned.date_range().start,
        end = %aligned.date_range().end,
        "alignment complete"
    );
    Ok(aligned)
}

/// Count, date range and per-column price statistics.
pub fn summarize(series: &AlignedSeries) -> DataSummary {
    let range = series.date_range();
    DataSummary {
        rows: series.len(),
        start_date: range.start,
        end_date: range.end,
        spot: column_stats(&series.spot_prices()),
        future: column_stats(&series.future_prices()),
    }
}

fn column_stats(prices: &[Price]) -> PriceColumnStats {
    let mean = stats::mean(prices);
    let std_dev = stats::sample_std(prices);
    PriceColumnStats {
        mean,
        std_dev,
        min: stats::min(prices),
        max: stats::max(prices),
        coefficient_of_variation_pct: std_dev / mean * 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn series(name: &str, rows: &[(u32, f64)]) -> PriceSeries {
        PriceSeries::new(
            name,
            rows.iter()
                .map(|(day, price)| Observation {
                    date: d(*day),
                    price: *price,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_inner_join_keeps_intersection() {
        let spot = series("spot_price", &[(1, 10.0), (2, 11.0), (3, 12.0), (6, 13.0)]);
        let fut = series("future_price", &[(2, 20.0), (3, 21.0), (4, 22.0), (6, 23.0)]);
        let aligned = align(&spot, &fut).unwrap();
        let dates: Vec<NaiveDate> = aligned.points().iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![d(2), d(3), d(6)]);
        assert_eq!(aligned.points()[2].future_price, 23.0);
    }

    #[test]
    fn test_no_overlap_is_empty_input() {
        let spot = series("spot_price", &[(1, 10.0)]);
        let fut = series("future_price", &[(2, 20.0)]);
        let err = align(&spot, &fut).unwrap_err();
        assert!(matches!(err, HedgeError::EmptyInput(_)));
        assert!(err.to_string().contains("overlapping"));
    }

    #[test]
    fn test_empty_side_is_empty_input() {
        let spot = series("spot_price", &[]);
        let fut = series("future_price", &[(2, 20.0)]);
        assert!(matches!(align(&spot, &fut), Err(HedgeError::EmptyInput(_))));
    }

    #[test]
    fn test_align_is_idempotent() {
        let spot = series("spot_price", &[(1, 10.0), (2, 11.0), (4, 12.5)]);
        let fut = series("future_price", &[(1, 20.0), (2, 21.0), (3, 19.0), (4, 22.0)]);
        let once = align(&spot, &fut).unwrap();
        let twice = align(&once.spot_series(), &once.future_series()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_new_rejects_unsorted_points() {
        let points = vec![
            PricePoint { date: d(2), spot_price: 1.0, future_price: 1.0 },
            PricePoint { date: d(1), spot_price: 1.0, future_price: 1.0 },
        ];
        assert!(AlignedSeries::new(points).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: AlignedSeries = serde_json::from_str(
            r#"[{"date":"2024-05-01","spot_price":1.0,"future_price":2.0}]"#,
        )
        .unwrap();
        assert_eq!(ok.len(), 1);
        let bad: Result<AlignedSeries, _> = serde_json::from_str("[]");
        assert!(bad.is_err());
    }

    #[test]
    fn test_tail_window() {
        let spot = series("spot_price", &[(1, 1.0), (2, 2.0), (3, 3.0)]);
        let aligned = align(&spot, &spot).unwrap();
        assert_eq!(aligned.tail(2).len(), 2);
        assert_eq!(aligned.tail(2)[0].date, d(2));
        assert_eq!(aligned.tail(0).len(), 3);
        assert_eq!(aligned.tail(10).len(), 3);
    }

    #[test]
    fn test_summary_statistics() {
        let spot = series("spot_price", &[(1, 10.0), (2, 20.0), (3, 30.0)]);
        let fut = series("future_price", &[(1, 5.0), (2, 5.0), (3, 5.0)]);
        let summary = summarize(&align(&spot, &fut).unwrap());
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.start_date, d(1));
        assert_eq!(summary.end_date, d(3));
        assert!((summary.spot.mean - 20.0).abs() < 1e-12);
        assert!((summary.spot.std_dev - 10.0).abs() < 1e-12);
        assert!((summary.spot.coefficient_of_variation_pct - 50.0).abs() < 1e-9);
        assert_eq!(summary.future.std_dev, 0.0);
        assert_eq!(summary.future.min, 5.0);
    }
}
