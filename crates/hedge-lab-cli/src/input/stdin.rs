use serde_json::Value;
use std::io::{self, Read};

use hedge_lab_core::data::AlignedSeries;

/// Attempt to read JSON from stdin if data is being piped.
/// Returns None if stdin is a TTY (interactive).
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(trimmed)?;
    Ok(Some(value))
}

/// Read an aligned series piped on stdin.
///
/// Accepts a bare array of points, an object with a `series` field, or the
/// full output envelope of `hedge align`.
pub fn read_series_stdin() -> Result<Option<AlignedSeries>, Box<dyn std::error::Error>> {
    match read_stdin()? {
        Some(value) => Ok(Some(series_from_value(value)?)),
        None => Ok(None),
    }
}

pub(crate) fn series_from_value(value: Value) -> Result<AlignedSeries, Box<dyn std::error::Error>> {
    let value = match value {
        Value::Object(mut map) => {
            let inner = match map.remove("result") {
                Some(Value::Object(mut result)) => result.remove("series"),
                _ => map.remove("series"),
            };
            inner.ok_or("stdin JSON has no 'series' array")?
        }
        other => other,
    };
    Ok(serde_json::from_value(value)?)
}
