//! Terminal rendering for the GeoGuard CLI.
//!
//! Tables and detail blocks for people, JSON or YAML for scripts.

use anyhow::Result;
use clap::ValueEnum;
use colored::*;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

/// Output format selection.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Render as a formatted table
    #[default]
    Table,
    /// Render as JSON
    Json,
    /// Render as YAML
    Yaml,
}

impl OutputFormat {
    /// Serialize `value` for the machine-readable formats. Table output has
    /// no generic rendering and falls back to JSON.
    fn render<T: Serialize + ?Sized>(self, value: &T) -> Result<String> {
        Ok(match self {
            Self::Table | Self::Json => serde_json::to_string_pretty(value)? + "\n",
            Self::Yaml => serde_yaml::to_string(value)?,
        })
    }
}

/// One-line status marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Info,
    Denied,
    Error,
}

impl Status {
    fn tag(self) -> ColoredString {
        match self {
            Self::Ok => "[OK]".green().bold(),
            Self::Info => "[INFO]".blue().bold(),
            Self::Denied => "[DENIED]".yellow().bold(),
            Self::Error => "[ERROR]".red().bold(),
        }
    }
}

/// Print `msg` behind a status marker. Errors go to stderr.
pub fn status(status: Status, msg: &str) {
    match status {
        Status::Error => eprintln!("{} {}", status.tag(), msg),
        _ => println!("{} {}", status.tag(), msg),
    }
}

/// Print rows as a table, or the whole slice as JSON/YAML.
pub fn print_list<T: Tabled + Serialize>(rows: &[T], format: OutputFormat) -> Result<()> {
    if !matches!(format, OutputFormat::Table) {
        print!("{}", format.render(rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("{}", "No results found.".dimmed());
        return Ok(());
    }
    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::first()).with(Alignment::left()))
        .to_string();
    println!("{}", table);
    Ok(())
}

/// Print a single value as JSON or YAML.
pub fn print_item<T: Serialize + ?Sized>(item: &T, format: OutputFormat) -> Result<()> {
    print!("{}", format.render(item)?);
    Ok(())
}

/// Titled block of key/value lines with the keys aligned.
#[derive(Debug, Default)]
pub struct Details {
    title: Option<String>,
    rows: Vec<(&'static str, String)>,
}

impl Details {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            rows: Vec::new(),
        }
    }

    pub fn untitled() -> Self {
        Self::default()
    }

    pub fn row(mut self, key: &'static str, value: impl ToString) -> Self {
        self.rows.push((key, value.to_string()));
        self
    }

    /// Add a row only when `value` is present.
    pub fn row_if<V: ToString>(self, key: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.row(key, v),
            None => self,
        }
    }

    pub fn print(&self) {
        if let Some(title) = &self.title {
            println!();
            println!("{}", title.bold().underline());
            println!();
        }
        let width = self.rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        for (key, value) in &self.rows {
            println!("  {}  {}", format!("{:<width$}", key).cyan(), value);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Entry {
        name: &'static str,
        position: usize,
    }

    #[test]
    fn test_render_formats() {
        let entry = Entry { name: "rest", position: 3 };
        let json = OutputFormat::Json.render(&entry).unwrap();
        assert!(json.contains("\"name\": \"rest\""));
        assert!(json.ends_with('\n'));
        assert_eq!(OutputFormat::Table.render(&entry).unwrap(), json);

        let yaml = OutputFormat::Yaml.render(&entry).unwrap();
        assert!(yaml.contains("name: rest"));
        assert!(yaml.contains("position: 3"));
    }

    #[test]
    fn test_details_skip_missing_rows() {
        let details = Details::titled("rest")
            .row("Filters", "basic, anonymous")
            .row_if("Role Filter", None::<&str>)
            .row_if("Interceptor", Some("interceptor"));
        assert_eq!(details.rows.len(), 2);
        assert_eq!(details.rows[1], ("Interceptor", "interceptor".to_string()));
    }
}
