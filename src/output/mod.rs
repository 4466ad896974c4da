//! Output formatting for CLI results

use serde::Serialize;
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::error::Result;

pub mod formatters;
pub mod json;
pub mod table;

/// Print rows as a table, or as enveloped JSON.
///
/// Pretty and table share the tabular rendering; commands with a richer
/// pretty view handle that format themselves before calling this.
pub fn print_rows<T: Tabled + Serialize>(rows: &[T], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", json::format_json(rows)?),
        OutputFormat::Pretty | OutputFormat::Table => println!("{}", table::format_table(rows)),
    }
    Ok(())
}

/// Print a single serializable value as enveloped JSON
pub fn print_json<T: Serialize + ?Sized>(data: &T) -> Result<()> {
    println!("{}", json::format_json(data)?);
    Ok(())
}
