//! Rendering command results for `--output`.
//!
//! `table` is for people; `json`, `json-compact` and `yaml` serialize the
//! core types as they are; `plain` prints one id or word per line for
//! shell pipelines.

use std::fmt::Display;
use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Output settings shared by every handler.
#[derive(Debug, Clone)]
pub struct Printer {
    format: OutputFormat,
    quiet: bool,
    color: bool,
}

impl Printer {
    pub fn new(global: &GlobalOpts) -> Self {
        let color = match global.color {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => {
                io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
            }
        };
        Self {
            format: global.output.clone(),
            quiet: global.quiet,
            color,
        }
    }

    pub fn format(&self) -> &OutputFormat {
        &self.format
    }

    /// A collection: a `Tabled` row per item, or the items themselves.
    pub fn list<T, R>(
        &self,
        items: &[T],
        to_row: impl Fn(&T) -> R,
        plain: impl Fn(&T) -> String,
    ) -> Result<(), CliError>
    where
        T: Serialize,
        R: Tabled,
    {
        let text = match self.format {
            OutputFormat::Table => table(&items.iter().map(to_row).collect::<Vec<_>>()),
            OutputFormat::Plain => items.iter().map(plain).collect::<Vec<_>>().join("\n"),
            _ => self.structured(items)?,
        };
        self.print(&text);
        Ok(())
    }

    /// One value: a hand-written detail view, or the value itself.
    pub fn single<T: Serialize>(
        &self,
        item: &T,
        detail: impl Fn(&T) -> String,
        plain: impl Fn(&T) -> String,
    ) -> Result<(), CliError> {
        let text = match self.format {
            OutputFormat::Table => detail(item),
            OutputFormat::Plain => plain(item),
            _ => self.structured(item)?,
        };
        self.print(&text);
        Ok(())
    }

    /// JSON or YAML according to the format; table and plain fall back to
    /// pretty JSON.
    pub fn structured<T: Serialize + ?Sized>(&self, data: &T) -> Result<String, CliError> {
        Ok(match self.format {
            OutputFormat::JsonCompact => serde_json::to_string(data)?,
            OutputFormat::Yaml => serde_yaml::to_string(data)?.trim_end().to_string(),
            _ => serde_json::to_string_pretty(data)?,
        })
    }

    /// Write `text` and a newline to stdout unless quiet or empty.
    pub fn print(&self, text: &str) {
        if self.quiet || text.is_empty() {
            return;
        }
        let _ = writeln!(io::stdout().lock(), "{text}");
    }

    /// Green when `ok`, yellow otherwise.
    pub fn paint(&self, text: impl Display, ok: bool) -> String {
        match (self.color, ok) {
            (false, _) => text.to_string(),
            (true, true) => text.green().to_string(),
            (true, false) => text.yellow().to_string(),
        }
    }

    pub fn dim(&self, text: impl Display) -> String {
        if self.color {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }
}

pub fn table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}
