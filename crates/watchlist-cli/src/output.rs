use clap::ValueEnum;
use comfy_table::{modifiers, presets, Table};
use owo_colors::OwoColorize;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    #[value(name = "json-pretty")]
    JsonPretty,
}

pub struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    pub fn is_human(&self) -> bool {
        self.format == OutputFormat::Human
    }

    pub fn success(&self, msg: impl AsRef<str>) {
        self.message("success", msg.as_ref(), || println!("{} {}", "✓".green(), msg.as_ref()));
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.message("info", msg.as_ref(), || println!("{}", msg.as_ref()));
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.message("warning", msg.as_ref(), || println!("{} {}", "⚠".yellow(), msg.as_ref()));
    }

    fn message(&self, kind: &str, msg: &str, human: impl FnOnce()) {
        if self.quiet {
            return;
        }
        match self.format {
            OutputFormat::Human => human(),
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.print_json(&json!({ "type": kind, "message": msg }));
            }
        }
    }

    /// Structured result; in human mode only the table or line is printed by the caller
    pub fn json(&self, data: &serde_json::Value) {
        if self.quiet || self.is_human() {
            return;
        }
        self.print_json(data);
    }

    pub fn table(&self, table: &mut Table) {
        if self.quiet || !self.is_human() {
            return;
        }
        table.load_preset(presets::UTF8_FULL);
        table.apply_modifier(modifiers::UTF8_ROUND_CORNERS);
        println!("{}", table);
    }

    fn print_json(&self, data: &serde_json::Value) {
        match self.format {
            OutputFormat::JsonPretty => {
                println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
            }
            _ => {
                println!("{}", serde_json::to_string(data).unwrap_or_default());
            }
        }
    }
}
