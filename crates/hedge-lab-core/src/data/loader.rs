use chrono::NaiveDate;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use super::series::{MissingValuePolicy, PriceSeries, RawObservation, RawPriceSeries};
use crate::error::HedgeError;
use crate::HedgeResult;

/// Header names accepted for the spot price column.
pub const SPOT_PRICE_COLUMNS: &[&str] = &["spot_price"];

/// Header names accepted for the futures price column, in priority order.
pub const FUTURE_PRICE_COLUMNS: &[&str] = &["future_price", "close", "settlement"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Parse a calendar date. Accepts `YYYY-MM-DD` and `YYYY/MM/DD`, either
/// one followed by a time-of-day, which is discarded.
pub fn parse_date(text: &str) -> HedgeResult<NaiveDate> {
    let trimmed = text.trim();
    let date_part = trimmed
        .split(|c: char| c == ' ' || c == 'T')
        .next()
        .unwrap_or(trimmed);
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, fmt) {
            return Ok(date);
        }
    }
    Err(HedgeError::DateError(format!(
        "cannot parse '{}' as a date (expected YYYY-MM-DD)",
        text
    )))
}

/// Read a `date,spot_price` table.
pub fn read_spot_csv<R: Read>(reader: R) -> HedgeResult<RawPriceSeries> {
    read_price_csv(reader, "spot_price", SPOT_PRICE_COLUMNS)
}

/// Read a `date,future_price` table (`close` / `settlement` also accepted).
pub fn read_futures_csv<R: Read>(reader: R) -> HedgeResult<RawPriceSeries> {
    read_price_csv(reader, "future_price", FUTURE_PRICE_COLUMNS)
}

/// Load, validate and clean a spot CSV file.
pub fn load_spot_csv(path: impl AsRef<Path>, policy: MissingValuePolicy) -> HedgeResult<PriceSeries> {
    let path = path.as_ref();
    debug!(path = %path.display(), "loading spot prices");
    read_spot_csv(File::open(path)?)?.clean(policy)
}

/// Load, validate and clean a futures CSV file.
pub fn load_futures_csv(
    path: impl AsRef<Path>,
    policy: MissingValuePolicy,
) -> HedgeResult<PriceSeries> {
    let path = path.as_ref();
    debug!(path = %path.display(), "loading futures prices");
    read_futures_csv(File::open(path)?)?.clean(policy)
}

fn read_price_csv<R: Read>(
    reader: R,
    series_name: &str,
    price_columns: &[&str],
) -> HedgeResult<RawPriceSeries> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_lowercase())
        .collect();

    let date_idx = headers.iter().position(|h| h == "date").ok_or_else(|| {
        HedgeError::InvalidInput {
            field: "date".into(),
            reason: format!("data must contain columns: date, {}", price_columns[0]),
        }
    })?;
    let price_idx = price_columns
        .iter()
        .find_map(|col| headers.iter().position(|h| h == col))
        .ok_or_else(|| HedgeError::InvalidInput {
            field: series_name.into(),
            reason: format!("data must contain columns: date, {}", price_columns[0]),
        })?;

    let mut observations = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let line = row + 2;
        let date_text = record.get(date_idx).unwrap_or("");
        if date_text.is_empty() {
            return Err(HedgeError::InvalidInput {
                field: "date".into(),
                reason: format!("missing date on line {}", line),
            });
        }
        let date = parse_date(date_text)?;
        let price = match record.get(price_idx).unwrap_or("") {
            "" => None,
            text => Some(text.parse::<f64>().map_err(|_| HedgeError::InvalidInput {
                field: series_name.into(),
                reason: format!("'{}' on line {} is not a number", text, line),
            })?),
        };
        observations.push(RawObservation { date, price });
    }

    if observations.is_empty() {
        return Err(HedgeError::EmptyInput(format!(
            "{} table has no data rows",
            series_name
        )));
    }

    Ok(RawPriceSeries::new(series_name, observations))
}
