//! Table and JSON output for CLI commands.

use serde::Serialize;
use serde_json::Value;
use tabled::{Table, Tabled};

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

fn to_json<T: Serialize + ?Sized>(item: &T, fallback: &str) -> String {
    serde_json::to_string_pretty(item).unwrap_or_else(|_| fallback.to_string())
}

/// Print rows as a table, or as a JSON array
pub fn print_list<T: Serialize + Tabled>(rows: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", to_json(rows, "[]")),
        OutputFormat::Table if rows.is_empty() => println!("Nothing to show."),
        OutputFormat::Table => println!("{}", Table::new(rows)),
    }
}

/// Print one serializable item; tables fall back to its debug form
pub fn print_item<T: Serialize + std::fmt::Debug>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", to_json(item, "{}")),
        OutputFormat::Table => println!("{item:#?}"),
    }
}

/// Print a single hook result. Bare strings lose their quotes in table mode.
pub fn print_value(value: &Value, format: OutputFormat) {
    match (format, value) {
        (OutputFormat::Table, Value::String(s)) => println!("{s}"),
        _ => println!("{value}"),
    }
}

pub fn print_success(msg: &str) {
    println!("✓ {msg}");
}

pub fn print_warning(msg: &str) {
    println!("⚠ {msg}");
}

pub fn print_error(msg: &str) {
    eprintln!("✗ {msg}");
}

/// Print an indented `key: value` line
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<20} {value}", format!("{key}:"));
}

/// Render an optional field for a table cell.
pub fn or_dash(value: Option<&str>) -> String {
    value.map_or_else(|| "-".to_string(), str::to_string)
}
