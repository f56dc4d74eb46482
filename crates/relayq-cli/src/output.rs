//! Table and JSON output formatting for CLI commands.

use serde::Serialize;
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

/// Print rows as a table, or the whole value as JSON
pub fn print_rows<T: Serialize, R: Tabled>(value: &T, rows: &[R], format: OutputFormat) {
    match format {
        OutputFormat::Table => println!("{}", Table::new(rows)),
        OutputFormat::Json => print_json(value),
    }
}

/// Print a value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    println!("{json}");
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {msg}");
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("⚠ {msg}");
}

/// Print an error message
pub fn print_error(msg: &str) {
    eprintln!("✗ {msg}");
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<18} {}", format!("{key}:"), value);
}
