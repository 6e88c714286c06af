use serde_json::{Map, Value};
use std::io::{self, Write};

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    if let Err(e) = write_csv(value, stdout.lock()) {
        eprintln!("CSV output error: {}", e);
    }
}

/// Render an output envelope as CSV.
///
/// Row-shaped results (sensitivity sweeps, rolling statistics) and a
/// backtest's daily `records` become one CSV row per element. Any other
/// result object is flattened into `field,value` pairs with dotted names,
/// so `estimate.optimal_hedge_ratio` or `summary.stress_effectiveness` keep
/// their context.
pub fn write_csv<W: Write>(value: &Value, writer: W) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Array(rows) => write_rows(&mut wtr, rows)?,
        Value::Object(map) => match map.get("records") {
            Some(Value::Array(records)) if !records.is_empty() => write_rows(&mut wtr, records)?,
            _ => {
                wtr.write_record(["field", "value"])?;
                let mut fields = Vec::new();
                flatten("", map, &mut fields);
                for (name, val) in fields {
                    wtr.write_record([name, val])?;
                }
            }
        },
        other => wtr.write_record([format_csv_value(other)])?,
    }
    wtr.flush()?;
    Ok(())
}

fn write_rows<W: Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) -> csv::Result<()> {
    let Some(Value::Object(first)) = rows.first() else {
        for item in rows {
            wtr.write_record([format_csv_value(item)])?;
        }
        return Ok(());
    };

    // Stress periods nest their period info; headers come from the flattened first row.
    let mut header_fields = Vec::new();
    flatten("", first, &mut header_fields);
    let headers: Vec<String> = header_fields.into_iter().map(|(name, _)| name).collect();
    wtr.write_record(&headers)?;

    for item in rows {
        let mut fields = Vec::new();
        if let Value::Object(map) = item {
            flatten("", map, &mut fields);
        }
        let row: Vec<String> = headers
            .iter()
            .map(|h| {
                fields
                    .iter()
                    .find(|(name, _)| name == h)
                    .map(|(_, val)| val.clone())
                    .unwrap_or_default()
            })
            .collect();
        wtr.write_record(&row)?;
    }
    Ok(())
}

/// Nested objects become dotted names; nested tables are only counted.
fn flatten(prefix: &str, map: &Map<String, Value>, out: &mut Vec<(String, String)>) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match val {
            Value::Object(child) => flatten(&name, child, out),
            Value::Array(items) if items.first().is_some_and(Value::is_object) => {
                out.push((name, format!("[{} rows]", items.len())));
            }
            _ => out.push((name, format_csv_value(val))),
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        // NaN metrics serialize as null
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn render(value: &Value) -> String {
        let mut buf = Vec::new();
        write_csv(value, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    // serde_json maps iterate in key order, so columns come out sorted.

    #[test]
    fn test_hedge_ratio_result_is_flattened() {
        let out = json!({
            "result": {
                "estimate": { "optimal_hedge_ratio": 0.92, "observations": 60 },
                "validation": { "is_valid": true },
                "quantity": { "contracts": null }
            },
            "warnings": []
        });
        assert_eq!(
            render(&out),
            "field,value\nestimate.observations,60\nestimate.optimal_hedge_ratio,0.92\n\
             quantity.contracts,\nvalidation.is_valid,true\n"
        );
    }

    #[test]
    fn test_sweep_rows_become_csv_rows() {
        let out = json!({
            "result": [
                { "hedge_ratio": 0.8, "effectiveness": 0.9 },
                { "hedge_ratio": 1.0, "effectiveness": 0.95 }
            ]
        });
        assert_eq!(render(&out), "effectiveness,hedge_ratio\n0.9,0.8\n0.95,1.0\n");
    }

    #[test]
    fn test_backtest_records_win_over_summary() {
        let out = json!({
            "result": {
                "metrics": { "total_days": 2 },
                "records": [
                    { "date": "2024-05-02", "total_pnl": 30.0 },
                    { "date": "2024-05-03", "total_pnl": -4.5 }
                ]
            }
        });
        assert_eq!(render(&out), "date,total_pnl\n2024-05-02,30.0\n2024-05-03,-4.5\n");
    }

    #[test]
    fn test_nested_stress_rows_use_dotted_headers() {
        let rows = json!([
            { "period_info": { "kind": "sharp_decline", "duration_days": 5 }, "days": 5 },
            { "period_info": { "kind": "sharp_rally", "duration_days": 4 }, "days": 4 }
        ]);
        assert_eq!(
            render(&rows),
            "days,period_info.duration_days,period_info.kind\n5,5,sharp_decline\n4,4,sharp_rally\n"
        );
    }
}
