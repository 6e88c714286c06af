pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Print a command's output envelope in the requested format.
///
/// `json` keeps the whole envelope and `table` adds warnings below the
/// result. `csv` writes the result alone. `minimal` prints only the headline
/// number, or the raw Markdown for `hedge report`.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}
