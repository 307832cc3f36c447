use chrono::NaiveDate;
use colored::*;

use crate::error::LookupError;
use crate::hostname::NormalizedHostname;
use crate::record::{Field, ParsedRecord, RawRecord, CANONICAL_DATE_FORMAT};

pub const PROMPT: &str = "Enter a URL or hostname (empty to quit): ";
pub const NOT_AVAILABLE: &str = "N/A";

/// Turns query results into terminal text.
#[derive(Debug, Clone, Copy)]
pub struct Presenter {
    use_color: bool,
    show_raw: bool,
}

impl Presenter {
    pub fn new(use_color: bool, show_raw: bool) -> Self {
        Self { use_color, show_raw }
    }

    /// Uncolored output including the raw record.
    pub fn plain() -> Self {
        Self::new(false, true)
    }

    pub fn prompt(&self) -> String {
        self.paint(PROMPT, |s| s.bright_cyan().bold())
    }

    pub fn invalid_input(&self, input: &str) -> String {
        format!(
            "{}: {}",
            self.paint("Invalid URL or hostname", |s| s.bright_red()),
            input.trim()
        )
    }

    pub fn lookup_failure(&self, hostname: &NormalizedHostname, error: &LookupError) -> String {
        format!(
            "{} {}: {}",
            self.paint("Lookup failed for", |s| s.bright_red()),
            self.paint(hostname.as_str(), |s| s.bright_white().bold()),
            error
        )
    }

    /// Header, optional raw record and the four derived fields.
    pub fn record(
        &self,
        hostname: &NormalizedHostname,
        raw: &RawRecord,
        parsed: &ParsedRecord,
    ) -> String {
        let mut out = Vec::new();
        out.push(format!(
            "{} {}",
            self.paint("WHOIS record for", |s| s.bright_green()),
            self.paint(hostname.as_str(), |s| s.bright_white().bold())
        ));

        if self.show_raw {
            out.push(self.raw_record(raw));
            out.push(String::new());
        }

        out.push(self.paint("Registration summary", |s| s.bright_cyan().bold()));
        for field in Field::ALL {
            out.push(self.summary_line(field, parsed));
        }
        if parsed.is_empty() {
            out.push(self.paint(
                "No recognizable registration fields in this record",
                |s| s.yellow(),
            ));
        }

        out.join("\n")
    }

    fn summary_line(&self, field: Field, parsed: &ParsedRecord) -> String {
        let value = match field {
            Field::RegistrantCountry => parsed.registrant_country.clone(),
            Field::CreationDate => parsed.creation_date.map(format_date),
            Field::UpdatedDate => parsed.updated_date.map(format_date),
            Field::ExpiryDate => parsed.expiry_date.map(format_date),
        };

        let name = format!("{:<20}", format!("{}:", field.display_name()));
        let value = match value {
            Some(value) => self.paint(&value, |s| match field {
                Field::RegistrantCountry => s.yellow(),
                _ => s.bright_magenta(),
            }),
            None => self.paint(NOT_AVAILABLE, |s| s.bright_black()),
        };
        format!("  {}{}", self.paint(&name, |s| s.bright_white()), value)
    }

    /// The raw record with field/value lines colored by category.
    pub fn raw_record(&self, raw: &RawRecord) -> String {
        if !self.use_color {
            return raw.as_str().trim_end().to_string();
        }

        raw.as_str()
            .trim_end()
            .lines()
            .map(colorize_raw_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn paint(&self, text: &str, style: impl Fn(&str) -> ColoredString) -> String {
        if self.use_color {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(CANONICAL_DATE_FORMAT).to_string()
}

fn colorize_raw_line(line: &str) -> String {
    let trimmed = line.trim_start();
    if trimmed.starts_with('%') || trimmed.starts_with('#') || trimmed.starts_with(">>>") {
        return line.bright_black().to_string();
    }

    match line.split_once(':') {
        Some((field, value)) if !field.trim().is_empty() && !value.trim().is_empty() => {
            let indent = &line[..line.len() - trimmed.len()];
            format!(
                "{}{}: {}",
                indent,
                colorize_field_name(field.trim()),
                colorize_field_value(field.trim(), value.trim())
            )
        }
        _ => colorize_special_line(line),
    }
}

fn colorize_field_name(field: &str) -> String {
    let lower = field.to_lowercase();
    if is_date_field(&lower) {
        field.bright_magenta().to_string()
    } else if lower.contains("country") {
        field.bright_white().to_string()
    } else if lower.contains("registrar") || lower.contains("reseller") {
        field.bright_blue().to_string()
    } else if lower.contains("status") {
        field.bright_yellow().to_string()
    } else if lower.contains("name server") || lower == "nserver" {
        field.yellow().bold().to_string()
    } else if lower == "domain" || lower == "domain name" {
        field.bright_cyan().bold().to_string()
    } else {
        field.white().to_string()
    }
}

fn colorize_field_value(field: &str, value: &str) -> String {
    let lower = field.to_lowercase();
    if lower == "domain" || lower == "domain name" {
        value.bright_white().bold().to_string()
    } else if is_date_field(&lower) {
        value.bright_magenta().to_string()
    } else if lower.contains("country") {
        value.yellow().to_string()
    } else if lower.contains("name server") || lower == "nserver" {
        value.bright_green().to_string()
    } else if lower.contains("registrar") {
        value.bright_blue().bold().to_string()
    } else if value.contains('@') {
        value.bright_yellow().to_string()
    } else {
        value.white().to_string()
    }
}

fn is_date_field(lower: &str) -> bool {
    ["date", "created", "updated", "expir", "registered on", "changed"]
        .iter()
        .any(|marker| lower.contains(marker))
}

fn colorize_special_line(line: &str) -> String {
    let lower = line.to_lowercase();
    if lower.contains("no match") || lower.contains("not found") || lower.contains("error") {
        line.bright_red().to_string()
    } else {
        line.white().to_string()
    }
}
