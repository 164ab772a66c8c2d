//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print rows as a rounded table, or as a JSON array
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => print_json(&items),
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{}", json);
    }
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Share of traffic as a percentage
pub fn format_share(share: f64) -> String {
    format!("{:.2}%", share * 100.0)
}

/// Color a runtime or deployment state
pub fn color_state(state: &str) -> String {
    match state.to_lowercase().as_str() {
        "running" | "done" => state.green().to_string(),
        "created" | "restarting" | "paused" => state.yellow().to_string(),
        "exited" | "dead" | "failed" => state.red().to_string(),
        _ => state.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_share() {
        assert_eq!(format_share(1.0 / 3.0), "33.33%");
        assert_eq!(format_share(0.5), "50.00%");
        assert_eq!(format_share(1.0), "100.00%");
    }

    #[test]
    fn test_color_state_keeps_text() {
        colored::control::set_override(false);
        assert_eq!(color_state("running"), "running");
        assert_eq!(color_state("weird"), "weird");
    }
}
