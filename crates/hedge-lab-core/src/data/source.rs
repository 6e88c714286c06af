use std::path::PathBuf;
use tracing::{debug, info};

use super::loader::load_futures_csv;
use super::series::{MissingValuePolicy, PriceSeries};
use crate::error::HedgeError;
use crate::types::DateRange;
use crate::HedgeResult;

/// Futures prices returned by a [`FuturesSource`].
#[derive(Debug, Clone)]
pub struct FuturesFetch {
    pub series: PriceSeries,
    /// Whether the provider answered from its own cache.
    pub from_cache: bool,
}

/// Provider of daily futures prices by contract symbol and date range.
///
/// Implementations own their retrieval and caching; the analytics only
/// consume the resulting series.
pub trait FuturesSource {
    fn fetch_futures(&self, symbol: &str, range: DateRange) -> HedgeResult<FuturesFetch>;
}

/// Reads `<root>/<symbol>.csv` and keeps the rows inside the requested range.
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    root: PathBuf,
    policy: MissingValuePolicy,
}

impl CsvDirectorySource {
    pub fn new(root: impl Into<PathBuf>, policy: MissingValuePolicy) -> Self {
        CsvDirectorySource {
            root: root.into(),
            policy,
        }
    }

    fn path_for(&self, symbol: &str) -> HedgeResult<PathBuf> {
        let valid = !symbol.is_empty()
            && symbol
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(HedgeError::InvalidInput {
                field: "symbol".into(),
                reason: format!("'{}' is not a valid contract symbol", symbol),
            });
        }
        Ok(self.root.join(format!("{}.csv", symbol)))
    }
}

impl FuturesSource for CsvDirectorySource {
    fn fetch_futures(&self, symbol: &str, range: DateRange) -> HedgeResult<FuturesFetch> {
        if range.is_inverted() {
            return Err(HedgeError::InvalidInput {
                field: "range".into(),
                reason: format!("start {} is after end {}", range.start, range.end),
            });
        }
        let path = self.path_for(symbol)?;
        debug!(symbol, path = %path.display(), "reading futures history");
        let series = load_futures_csv(&path, self.policy)?.within(range);
        if series.is_empty() {
            return Err(HedgeError::EmptyInput(format!(
                "no futures data for {} between {} and {}",
                symbol, range.start, range.end
            )));
        }
        info!(symbol, rows = series.len(), "futures history loaded");
        Ok(FuturesFetch {
            series,
            from_cache: false,
        })
    }
}
