use serde_json::Value;
use std::io::{self, Write};

/// Pretty-print JSON to stdout.
///
/// The envelope printed here is also what the price-taking commands read
/// back from stdin, so `hedge align | hedge backtest` needs no reshaping.
pub fn print_json(value: &Value) {
    let stdout = io::stdout();
    if let Err(e) = write_json(value, stdout.lock()) {
        eprintln!("JSON serialization error: {}", e);
    }
}

pub fn write_json<W: Write>(value: &Value, mut writer: W) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::stdin::series_from_value;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_align_output_pipes_back_as_series() {
        let envelope = json!({
            "result": {
                "summary": { "rows": 2 },
                "series": [
                    {"date": "2024-01-02", "spot_price": 100.0, "future_price": 98.0},
                    {"date": "2024-01-03", "spot_price": 101.5, "future_price": null}
                ]
            },
            "warnings": ["only 2 aligned rows"]
        });
        let mut buf = Vec::new();
        write_json(&envelope, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with("}\n"));

        // A null price (NaN on the way out) fails the series checks on the way in.
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, envelope);
        assert!(series_from_value(parsed).is_err());

        let mut clean = envelope.clone();
        clean["result"]["series"][1]["future_price"] = json!(99.1);
        let series = series_from_value(clean).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[1].future_price, 99.1);
    }
}
