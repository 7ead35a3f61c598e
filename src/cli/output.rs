//! Output formatting
//!
//! Every command that returns data renders it as a table (the default),
//! JSON or YAML. Tables use an empty border style.

use clap::ValueEnum;
use serde::Serialize;
use tabled::Tabled;
use tabled::settings::{Padding, Style};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

/// Render `rows` as a borderless table
pub fn table<R: Tabled>(rows: impl IntoIterator<Item = R>) -> String {
    tabled::Table::new(rows)
        .with(Style::empty())
        .with(Padding::new(0, 1, 0, 0))
        .to_string()
}

/// Render `value` in the requested format, using `rows` for tables
pub fn render<T, R>(format: OutputFormat, value: &T, rows: impl IntoIterator<Item = R>) -> Result<String>
where
    T: Serialize + ?Sized,
    R: Tabled,
{
    let text = match format {
        OutputFormat::Table => table(rows),
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    Ok(text.trim_end().to_string())
}

/// Render a single record
pub fn render_one<T>(format: OutputFormat, value: &T) -> Result<String>
where
    T: Serialize + Tabled + Clone,
{
    render(format, value, [value.clone()])
}
