use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::HedgeError;
use crate::types::{DateRange, Price};
use crate::HedgeResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How rows with a missing price are treated before alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValuePolicy {
    /// Remove every row whose price is missing.
    #[default]
    Drop,
    /// Fill interior gaps linearly along the calendar axis, then drop
    /// leading/trailing rows that are still missing.
    Interpolate,
}

/// A row as read from a data source; the price may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub date: NaiveDate,
    pub price: Option<Price>,
}

/// A single-column price history before cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPriceSeries {
    /// Column label ("spot_price", "future_price", or a symbol)
    pub name: String,
    pub observations: Vec<RawObservation>,
}

/// A dated price with no gaps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub price: Price,
}

/// A cleaned single-column price history: sorted ascending, unique dates,
/// finite non-negative prices. May be empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    name: String,
    observations: Vec<Observation>,
}

// ---------------------------------------------------------------------------
// Cleaning
// ---------------------------------------------------------------------------

impl RawPriceSeries {
    pub fn new(name: impl Into<String>, observations: Vec<RawObservation>) -> Self {
        RawPriceSeries {
            name: name.into(),
            observations,
        }
    }

    pub fn missing_count(&self) -> usize {
        self.observations.iter().filter(|o| o.price.is_none()).count()
    }

    /// Apply the missing-value policy and validate the result.
    pub fn clean(&self, policy: MissingValuePolicy) -> HedgeResult<PriceSeries> {
        if self.observations.is_empty() {
            return Err(HedgeError::EmptyInput(format!(
                "{} series has no rows",
                self.name
            )));
        }

        let mut rows = self.observations.clone();
        rows.sort_by_key(|o| o.date);
        check_prices(&self.name, rows.iter().filter_map(|o| o.price))?;
        check_unique_dates(&self.name, rows.iter().map(|o| o.date))?;

        let missing = self.missing_count();
        let observations = match policy {
            MissingValuePolicy::Drop => rows
                .iter()
                .filter_map(|o| o.price.map(|price| Observation { date: o.date, price }))
                .collect(),
            MissingValuePolicy::Interpolate => interpolate_gaps(&rows),
        };

        debug!(
            series = %self.name,
            rows = self.observations.len(),
            missing,
            kept = observations.len(),
            ?policy,
            "cleaned price series"
        );

        PriceSeries::new(self.name.clone(), observations)
    }
}

/// Linear interpolation weighted by calendar-day distance between the
/// nearest known neighbours. Rows without a neighbour on both sides are dropped.
fn interpolate_gaps(rows: &[RawObservation]) -> Vec<Observation> {
    let known: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, o)| o.price.is_some())
        .map(|(i, _)| i)
        .collect();

    let mut out = Vec::with_capacity(rows.len());
    let mut next_known = 0usize;
    for row in rows {
        if let Some(price) = row.price {
            out.push(Observation {
                date: row.date,
                price,
            });
            next_known += 1;
            continue;
        }
        // `next_known` indexes the first known row after `row`.
        if next_known == 0 || next_known >= known.len() {
            continue;
        }
        let left = &rows[known[next_known - 1]];
        let right = &rows[known[next_known]];
        let (lp, rp) = match (left.price, right.price) {
            (Some(lp), Some(rp)) => (lp, rp),
            _ => continue,
        };
        let span = (right.date - left.date).num_days() as f64;
        let offset = (row.date - left.date).num_days() as f64;
        out.push(Observation {
            date: row.date,
            price: lp + (rp - lp) * offset / span,
        });
    }
    out
}

fn check_prices(name: &str, prices: impl Iterator<Item = Price>) -> HedgeResult<()> {
    for price in prices {
        if !price.is_finite() {
            return Err(HedgeError::InvalidInput {
                field: name.to_string(),
                reason: format!("price {} is not a finite number", price),
            });
        }
        if price < 0.0 {
            return Err(HedgeError::InvalidInput {
                field: name.to_string(),
                reason: format!("prices cannot be negative (found {})", price),
            });
        }
    }
    Ok(())
}

fn check_unique_dates(name: &str, sorted_dates: impl Iterator<Item = NaiveDate>) -> HedgeResult<()> {
    let mut prev: Option<NaiveDate> = None;
    for date in sorted_dates {
        if prev == Some(date) {
            return Err(HedgeError::InvalidInput {
                field: name.to_string(),
                reason: format!("duplicate date {}", date),
            });
        }
        prev = Some(date);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// PriceSeries
// ---------------------------------------------------------------------------

impl PriceSeries {
    /// Sort and validate a gap-free series.
    pub fn new(name: impl Into<String>, mut observations: Vec<Observation>) -> HedgeResult<Self> {
        let name = name.into();
        observations.sort_by_key(|o| o.date);
        check_prices(&name, observations.iter().map(|o| o.price))?;
        check_unique_dates(&name, observations.iter().map(|o| o.date))?;
        Ok(PriceSeries { name, observations })
    }

    /// Caller guarantees the rows are already sorted, unique and valid.
    pub(crate) fn from_validated(name: impl Into<String>, observations: Vec<Observation>) -> Self {
        PriceSeries {
            name: name.into(),
            observations,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn date_range(&self) -> Option<DateRange> {
        match (self.observations.first(), self.observations.last()) {
            (Some(first), Some(last)) => Some(DateRange::new(first.date, last.date)),
            _ => None,
        }
    }

    /// Observations whose date falls inside `range`.
    pub fn within(&self, range: DateRange) -> PriceSeries {
        PriceSeries {
            name: self.name.clone(),
            observations: self
                .observations
                .iter()
                .filter(|o| range.contains(o.date))
                .copied()
                .collect(),
        }
    }
}
