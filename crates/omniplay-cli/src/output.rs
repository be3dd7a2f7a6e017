//! Output formatting for CLI

use console::{style, StyledObject};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

pub struct OutputManager {
    format: OutputFormat,
    colored: bool,
}

impl OutputManager {
    pub fn new(format: OutputFormat, colored: bool) -> Self {
        Self { format, colored }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn paint<F>(&self, text: &str, styled: F) -> String
    where
        F: FnOnce(StyledObject<String>) -> StyledObject<String>,
    {
        if self.colored {
            styled(style(text.to_string())).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn heading(&self, text: &str) -> String {
        self.paint(text, |s| s.green().bold())
    }

    pub fn key(&self, text: &str) -> String {
        self.paint(text, |s| s.yellow())
    }

    pub fn value(&self, text: &str) -> String {
        self.paint(text, |s| s.cyan())
    }

    pub fn failure(&self, text: &str) -> String {
        self.paint(text, |s| s.red().bold())
    }

    /// `key: value` line for text output
    pub fn field(&self, key: &str, value: impl std::fmt::Display) -> String {
        format!("  {}: {}", self.key(key), self.value(&value.to_string()))
    }

    pub fn json<T: Serialize + ?Sized>(&self, data: &T) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    pub fn table<R: Tabled>(&self, rows: impl IntoIterator<Item = R>) -> String {
        Table::new(rows).with(Style::rounded()).to_string()
    }
}

/// Seconds with up to three decimals, `-` when absent
pub fn seconds(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_nan() => "NaN".to_string(),
        Some(v) => format!("{:.3}", v)
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string(),
        None => "-".to_string(),
    }
}
