use chrono::NaiveDate;
use clap::Args;
use tracing::{debug, info};

use hedge_lab_core::backtest::HedgeDirection;
use hedge_lab_core::config::AnalysisConfig;
use hedge_lab_core::data::loader::{load_futures_csv, load_spot_csv, parse_date};
use hedge_lab_core::data::source::{CsvDirectorySource, FuturesSource};
use hedge_lab_core::data::{align, AlignedSeries, MissingValuePolicy};
use hedge_lab_core::types::DateRange;

use crate::input;

/// Where prices come from, plus the optional config file.
#[derive(Args, Debug, Clone)]
pub struct PriceArgs {
    /// Spot price CSV (`date,spot_price`)
    #[arg(long)]
    pub spot: Option<String>,

    /// Futures price CSV (`date,future_price`, `close` or `settlement`)
    #[arg(long, conflicts_with = "symbol")]
    pub futures: Option<String>,

    /// Futures contract symbol, read from `<data-dir>/<symbol>.csv`
    #[arg(long, requires = "data_dir")]
    pub symbol: Option<String>,

    /// Directory holding one futures CSV per contract symbol
    #[arg(long)]
    pub data_dir: Option<String>,

    /// First date to keep (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date_arg)]
    pub from: Option<NaiveDate>,

    /// Last date to keep (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date_arg)]
    pub to: Option<NaiveDate>,

    /// Missing price handling: drop or interpolate
    #[arg(long, value_parser = parse_policy_arg)]
    pub missing: Option<MissingValuePolicy>,

    /// Analysis config file (JSON or YAML); flags override its fields
    #[arg(long)]
    pub config: Option<String>,
}

pub fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).map_err(|e| e.to_string())
}

pub fn parse_direction_arg(s: &str) -> Result<HedgeDirection, String> {
    s.parse::<HedgeDirection>().map_err(|e| e.to_string())
}

fn parse_policy_arg(s: &str) -> Result<MissingValuePolicy, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "drop" => Ok(MissingValuePolicy::Drop),
        "interpolate" => Ok(MissingValuePolicy::Interpolate),
        other => Err(format!("unknown missing value policy '{}' (expected drop or interpolate)", other)),
    }
}

impl PriceArgs {
    /// Config file contents (or defaults) with `--missing` applied.
    pub fn load_config(&self) -> Result<AnalysisConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => input::file::read_config(path)?,
            None => AnalysisConfig::default(),
        };
        if let Some(policy) = self.missing {
            config.missing_value_policy = policy;
        }
        Ok(config)
    }

    /// Build the aligned series from CSV files, the futures directory or stdin.
    pub fn load_series(&self, policy: MissingValuePolicy) -> Result<AlignedSeries, Box<dyn std::error::Error>> {
        let series = match (&self.spot, &self.futures, &self.symbol) {
            (Some(spot_path), Some(futures_path), _) => {
                let spot = load_spot_csv(spot_path, policy)?;
                let future = load_futures_csv(futures_path, policy)?;
                align(&spot, &future)?
            }
            (Some(spot_path), None, Some(symbol)) => {
                let spot = load_spot_csv(spot_path, policy)?;
                let spot_range = spot.date_range().ok_or("spot series is empty")?;
                let range = DateRange::new(
                    self.from.unwrap_or(spot_range.start),
                    self.to.unwrap_or(spot_range.end),
                );
                let root = self.data_dir.as_deref().unwrap_or(".");
                let fetch = CsvDirectorySource::new(root, policy).fetch_futures(symbol, range)?;
                debug!(symbol = %symbol, cached = fetch.from_cache, "futures fetched");
                align(&spot, &fetch.series)?
            }
            (None, None, None) => input::stdin::read_series_stdin()?.ok_or(
                "price input required: --spot with --futures or --symbol, or an aligned series on stdin",
            )?,
            _ => {
                return Err("--spot must be combined with either --futures or --symbol/--data-dir".into())
            }
        };
        let series = self.restrict(series)?;
        info!(rows = series.len(), "price series ready");
        Ok(series)
    }

    fn restrict(&self, series: AlignedSeries) -> Result<AlignedSeries, Box<dyn std::error::Error>> {
        if self.from.is_none() && self.to.is_none() {
            return Ok(series);
        }
        let full = series.date_range();
        let range = DateRange::new(self.from.unwrap_or(full.start), self.to.unwrap_or(full.end));
        let points = series
            .points()
            .iter()
            .filter(|p| range.contains(p.date))
            .copied()
            .collect();
        Ok(AlignedSeries::new(points)?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::{Path, PathBuf};

    /// Calm market, a five-day selloff, calm recovery, then a four-day rally.
    const SPOT: [f64; 24] = [
        300.0, 301.0, 300.4, 301.2, 300.9, 301.5, 280.0, 260.0, 240.0, 222.0, 205.0, 205.5, 206.0,
        205.7, 206.4, 206.1, 206.8, 228.0, 251.0, 276.0, 304.0, 304.5, 304.1, 305.0,
    ];
    const BASIS: [f64; 24] = [
        -2.0, -2.1, -1.9, -2.0, -2.2, -2.0, -3.0, -3.5, -2.5, -3.1, -2.8, -2.0, -2.1, -2.3, -2.0,
        -1.9, -2.1, -2.6, -3.2, -2.9, -2.4, -2.0, -2.1, -2.0,
    ];

    pub(crate) fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, m, d).unwrap()
    }

    pub(crate) fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hedge-cli-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write(dir: &Path, file: &str, contents: &str) -> String {
        let path = dir.join(file);
        fs::write(&path, contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    pub(crate) fn price_args(spot: Option<String>, futures: Option<String>) -> PriceArgs {
        PriceArgs {
            spot,
            futures,
            symbol: None,
            data_dir: None,
            from: None,
            to: None,
            missing: None,
            config: None,
        }
    }

    /// Spot CSV plus a futures CSV named after contract `RB2005`, using the
    /// `close` header and slash dates a settlement export would carry.
    pub(crate) fn write_price_files(name: &str) -> (PathBuf, PriceArgs) {
        let dir = temp_dir(name);
        let mut spot = String::from("date,spot_price\n");
        let mut futures = String::from("Date,Close\n");
        for (i, (s, b)) in SPOT.iter().zip(BASIS.iter()).enumerate() {
            let day = date(3, 1) + chrono::Duration::days(i as i64);
            spot.push_str(&format!("{},{}\n", day, s));
            futures.push_str(&format!("{},{}\n", day.format("%Y/%m/%d"), s + b));
        }
        let spot_path = write(&dir, "spot.csv", &spot);
        let futures_path = write(&dir, "RB2005.csv", &futures);
        (dir, price_args(Some(spot_path), Some(futures_path)))
    }

    #[test]
    fn test_argument_parsers() {
        assert_eq!(parse_date_arg("2020/03/05").unwrap(), date(3, 5));
        assert!(parse_date_arg("March 5").is_err());
        assert_eq!(parse_direction_arg("long").unwrap(), HedgeDirection::LongHedge);
        assert_eq!(parse_direction_arg("short-hedge").unwrap(), HedgeDirection::ShortHedge);
        assert!(parse_direction_arg("sideways").is_err());
        assert_eq!(parse_policy_arg(" Interpolate ").unwrap(), MissingValuePolicy::Interpolate);
        assert!(parse_policy_arg("fill").unwrap_err().contains("drop or interpolate"));
    }

    #[test]
    fn test_csv_pair_aligns_with_close_header() {
        let (_dir, args) = write_price_files("pair");
        let series = args.load_series(MissingValuePolicy::Drop).unwrap();
        assert_eq!(series.len(), 24);
        assert_eq!(series.points()[0].date, date(3, 1));
        assert_eq!(series.points()[0].future_price, 298.0);
        assert_eq!(series.points()[23].spot_price, 305.0);
    }

    #[test]
    fn test_symbol_lookup_and_date_restriction() {
        let (dir, pair) = write_price_files("symbol");
        let args = PriceArgs {
            futures: None,
            symbol: Some("RB2005".to_string()),
            data_dir: Some(dir.to_string_lossy().into_owned()),
            from: Some(date(3, 5)),
            to: Some(date(3, 10)),
            ..pair
        };
        let series = args.load_series(MissingValuePolicy::Drop).unwrap();
        assert_eq!(series.len(), 6);
        assert_eq!(series.date_range(), DateRange::new(date(3, 5), date(3, 10)));

        let missing = PriceArgs {
            symbol: Some("CU2007".to_string()),
            ..args
        };
        assert!(missing.load_series(MissingValuePolicy::Drop).is_err());
    }

    #[test]
    fn test_missing_flag_overrides_policy() {
        let dir = temp_dir("gap");
        let spot = write(
            &dir,
            "spot.csv",
            "date,spot_price\n2020-03-02,100\n2020-03-03,\n2020-03-04,104\n2020-03-05,103\n",
        );
        let futures = write(
            &dir,
            "futures.csv",
            "date,future_price\n2020-03-02,98\n2020-03-03,99\n2020-03-04,101\n2020-03-05,100\n",
        );
        let mut args = price_args(Some(spot), Some(futures));

        let config = args.load_config().unwrap();
        assert_eq!(config.missing_value_policy, MissingValuePolicy::Drop);
        assert_eq!(args.load_series(config.missing_value_policy).unwrap().len(), 3);

        args.missing = Some(MissingValuePolicy::Interpolate);
        let config = args.load_config().unwrap();
        let series = args.load_series(config.missing_value_policy).unwrap();
        assert_eq!(series.len(), 4);
        assert_eq!(series.points()[1].spot_price, 102.0);
    }

    #[test]
    fn test_incomplete_source_flags_rejected() {
        let (_dir, pair) = write_price_files("incomplete");
        let args = PriceArgs { spot: None, ..pair };
        let err = args.load_series(MissingValuePolicy::Drop).unwrap_err();
        assert!(err.to_string().contains("--spot"));
    }
}
