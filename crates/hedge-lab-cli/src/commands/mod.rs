pub mod backtest;
pub mod data;
pub mod hedge_ratio;
pub mod report;
pub mod stress;

use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

use hedge_lab_core::types::with_metadata;

pub type CommandResult = Result<Value, Box<dyn std::error::Error>>;

/// Wrap a command's result in the standard output envelope.
pub fn envelope<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    started: Instant,
    result: T,
) -> CommandResult {
    let elapsed_us = started.elapsed().as_micros() as u64;
    let output = with_metadata(methodology, assumptions, warnings, elapsed_us, result);
    Ok(serde_json::to_value(output)?)
}
