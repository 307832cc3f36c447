use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

/// Layout of a canonical date once separators are normalized.
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Unstructured text as returned by a registry lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord(String);

impl RawRecord {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the record holds nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// Registration metadata pulled out of a [`RawRecord`].
///
/// Every field is independently optional; a record with no recognizable
/// labels is a normal result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRecord {
    pub registrant_country: Option<String>,
    pub creation_date: Option<NaiveDate>,
    pub updated_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
}

impl ParsedRecord {
    pub fn is_empty(&self) -> bool {
        self.registrant_country.is_none()
            && self.creation_date.is_none()
            && self.updated_date.is_none()
            && self.expiry_date.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    RegistrantCountry,
    CreationDate,
    UpdatedDate,
    ExpiryDate,
}

impl Field {
    pub const ALL: [Field; 4] = [
        Field::RegistrantCountry,
        Field::CreationDate,
        Field::UpdatedDate,
        Field::ExpiryDate,
    ];

    /// Human readable name used when presenting the field.
    pub fn display_name(self) -> &'static str {
        match self {
            Field::RegistrantCountry => "Registrant Country",
            Field::CreationDate => "Creation Date",
            Field::UpdatedDate => "Updated Date",
            Field::ExpiryDate => "Expiry Date",
        }
    }

    fn is_date(self) -> bool {
        !matches!(self, Field::RegistrantCountry)
    }
}

/// How a label is located inside a lowercased, trimmed line.
#[derive(Debug, Clone, Copy)]
pub enum LabelMatch {
    Contains(&'static str),
    StartsWith(&'static str),
}

impl LabelMatch {
    fn matches(self, lowered_line: &str) -> bool {
        match self {
            LabelMatch::Contains(label) => lowered_line.contains(label),
            LabelMatch::StartsWith(label) => lowered_line.starts_with(label),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldMatcher {
    pub field: Field,
    pub label: LabelMatch,
}

const fn contains(field: Field, label: &'static str) -> FieldMatcher {
    FieldMatcher { field, label: LabelMatch::Contains(label) }
}

const fn starts_with(field: Field, label: &'static str) -> FieldMatcher {
    FieldMatcher { field, label: LabelMatch::StartsWith(label) }
}

/// Label vocabulary, lowercase. New registry spellings go here.
pub const FIELD_MATCHERS: &[FieldMatcher] = &[
    contains(Field::RegistrantCountry, "registrant country:"),
    starts_with(Field::RegistrantCountry, "country:"),
    contains(Field::CreationDate, "created on:"),
    contains(Field::CreationDate, "creation date:"),
    contains(Field::CreationDate, "registered on:"),
    contains(Field::UpdatedDate, "updated on:"),
    contains(Field::UpdatedDate, "last updated on:"),
    contains(Field::UpdatedDate, "updated date:"),
    contains(Field::ExpiryDate, "expiration date:"),
    contains(Field::ExpiryDate, "expires on:"),
    contains(Field::ExpiryDate, "expiry date:"),
];

/// A recognized date layout and the separator it uses.
#[derive(Debug, Clone, Copy)]
pub struct DatePattern {
    pub pattern: &'static str,
    pub separator: char,
}

/// Date layouts in priority order; the first one found in a line wins.
pub const DATE_PATTERNS: &[DatePattern] = &[
    DatePattern { pattern: r"[0-9]{4}-[0-9]{2}-[0-9]{2}", separator: '-' },
    DatePattern { pattern: r"[0-9]{4}/[0-9]{2}/[0-9]{2}", separator: '/' },
];

static COMPILED_DATE_PATTERNS: LazyLock<Vec<(Regex, char)>> = LazyLock::new(|| {
    DATE_PATTERNS
        .iter()
        .map(|p| {
            let regex = Regex::new(p.pattern).expect("date patterns are valid regexes");
            (regex, p.separator)
        })
        .collect()
});

/// Find the first recognized date in `line` and return it as `YYYY-MM-DD`.
///
/// The result is lexical only; it may still be an impossible calendar date.
pub fn extract_date(line: &str) -> Option<String> {
    COMPILED_DATE_PATTERNS.iter().find_map(|(regex, separator)| {
        regex
            .find(line)
            .map(|m| m.as_str().replace(*separator, "-"))
    })
}

/// Value after the first `:` of a `label: value` line, if non-empty.
fn label_value(line: &str) -> Option<String> {
    let (_, value) = line.split_once(':')?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn to_calendar_date(field: Field, text: Option<String>) -> Option<NaiveDate> {
    let text = text?;
    match NaiveDate::parse_from_str(&text, CANONICAL_DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(err) => {
            tracing::debug!(field = field.display_name(), value = %text, error = %err, "discarding invalid calendar date");
            None
        }
    }
}

/// Line-oriented scanner for registration fields.
pub struct RecordParser;

impl RecordParser {
    /// Scan every line of `raw` and collect the four registration fields.
    ///
    /// Later matches overwrite earlier ones, so the last occurrence of a
    /// label in the record decides the value. Never fails.
    pub fn parse(raw: &RawRecord) -> ParsedRecord {
        let mut country: Option<String> = None;
        let mut creation: Option<String> = None;
        let mut updated: Option<String> = None;
        let mut expiry: Option<String> = None;

        for line in raw.as_str().lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let lowered = line.to_lowercase();

            for field in Self::matched_fields(&lowered) {
                let value = if field.is_date() {
                    extract_date(line)
                } else {
                    label_value(line)
                };
                let Some(value) = value else {
                    continue;
                };

                tracing::trace!(field = field.display_name(), value = %value, "matched line");
                let slot = match field {
                    Field::RegistrantCountry => &mut country,
                    Field::CreationDate => &mut creation,
                    Field::UpdatedDate => &mut updated,
                    Field::ExpiryDate => &mut expiry,
                };
                *slot = Some(value);
            }
        }

        ParsedRecord {
            registrant_country: country,
            creation_date: to_calendar_date(Field::CreationDate, creation),
            updated_date: to_calendar_date(Field::UpdatedDate, updated),
            expiry_date: to_calendar_date(Field::ExpiryDate, expiry),
        }
    }

    /// Fields whose labels appear in the line, each reported once, in
    /// [`Field::ALL`] order.
    fn matched_fields(lowered_line: &str) -> impl Iterator<Item = Field> + '_ {
        Field::ALL.into_iter().filter(move |field| {
            FIELD_MATCHERS
                .iter()
                .any(|m| m.field == *field && m.label.matches(lowered_line))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn parse(text: &str) -> ParsedRecord {
        RecordParser::parse(&RawRecord::new(text))
    }

    #[test]
    fn test_extract_date_with_slashes() {
        assert_eq!(
            extract_date("Creation Date: 2020/05/01 12:00:00"),
            Some("2020-05-01".to_string())
        );
    }

    #[test]
    fn test_extract_date_with_hyphens() {
        assert_eq!(
            extract_date("created on: 1997-09-15"),
            Some("1997-09-15".to_string())
        );
    }

    #[test]
    fn test_extract_date_prefers_hyphen_layout() {
        assert_eq!(
            extract_date("Expiry Date: 2030/01/02 (was 2029-01-02)"),
            Some("2029-01-02".to_string())
        );
    }

    #[test]
    fn test_extract_date_ignores_textual_months() {
        assert_eq!(extract_date("Expires on: 15-Sep-2028"), None);
        assert_eq!(extract_date("Created on: September 15 1997"), None);
    }

    #[test]
    fn test_extract_date_from_timestamp() {
        assert_eq!(
            extract_date("Updated Date: 2022-09-20T04:00:00Z"),
            Some("2022-09-20".to_string())
        );
    }

    #[test]
    fn test_documented_example_record() {
        let raw = "\
   Domain Name: EXAMPLE.COM
   Registry Domain ID: 2336799_DOMAIN_COM-VRSN
   Updated Date: 2022-09-20T04:00:00Z
   Creation Date: 1997-09-15T04:00:00Z
   Registry Expiry Date: 2028-09-14T04:00:00Z
   Registrar: RESERVED-Internet Assigned Numbers Authority
   Registrant Country: US
";
        let parsed = parse(raw);
        assert_eq!(parsed.registrant_country.as_deref(), Some("US"));
        assert_eq!(parsed.creation_date, date(1997, 9, 15));
        assert_eq!(parsed.updated_date, date(2022, 9, 20));
        assert_eq!(parsed.expiry_date, date(2028, 9, 14));
        assert!(!parsed.is_empty());
    }

    #[test]
    fn test_last_country_match_wins() {
        let raw = "Registrant Country: US\nRegistrar: Someone\nCountry: CA\n";
        assert_eq!(parse(raw).registrant_country.as_deref(), Some("CA"));
    }

    #[test]
    fn test_last_date_match_wins() {
        let raw = "\
Creation Date: 2001-01-01
Registrar Registration Expiration Date: 2025-05-05
Creation Date: 2002/02/02
Registry Expiry Date: 2026-06-06
";
        let parsed = parse(raw);
        assert_eq!(parsed.creation_date, date(2002, 2, 2));
        assert_eq!(parsed.expiry_date, date(2026, 6, 6));
    }

    #[test]
    fn test_no_labels_yields_empty_record() {
        let parsed = parse("No match for domain \"NOPE.EXAMPLE\".\n>>> Last update of WHOIS database <<<\n");
        assert_eq!(parsed, ParsedRecord::default());
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_empty_text_yields_empty_record() {
        assert!(parse("").is_empty());
    }

    #[test]
    fn test_calendar_invalid_date_is_absent() {
        let parsed = parse("Creation Date: 2021-13-40\nExpiry Date: 2021-02-30");
        assert_eq!(parsed.creation_date, None);
        assert_eq!(parsed.expiry_date, None);
    }

    #[test]
    fn test_invalid_last_match_discards_earlier_valid_date() {
        let parsed = parse("Updated Date: 2020-01-01\nUpdated Date: 2020-02-31");
        assert_eq!(parsed.updated_date, None);
    }

    #[test]
    fn test_label_without_date_keeps_previous_value() {
        let parsed = parse("Expiration Date: 2024-03-03\nExpiration Date: unknown");
        assert_eq!(parsed.expiry_date, date(2024, 3, 3));
    }

    #[test]
    fn test_labels_are_case_insensitive() {
        let raw = "REGISTERED ON: 2010/10/10\nLAST UPDATED ON: 2011-11-11\nEXPIRES ON: 2012-12-12\nCOUNTRY: de";
        let parsed = parse(raw);
        assert_eq!(parsed.creation_date, date(2010, 10, 10));
        assert_eq!(parsed.updated_date, date(2011, 11, 11));
        assert_eq!(parsed.expiry_date, date(2012, 12, 12));
        assert_eq!(parsed.registrant_country.as_deref(), Some("de"));
    }

    #[test]
    fn test_country_prefix_only_at_line_start() {
        let parsed = parse("Admin Country: FR\nTech Country: GB");
        assert_eq!(parsed.registrant_country, None);
    }

    #[test]
    fn test_country_value_keeps_literal_text() {
        let parsed = parse("Registrant Country: United Kingdom");
        assert_eq!(parsed.registrant_country.as_deref(), Some("United Kingdom"));
    }

    #[test]
    fn test_empty_country_value_is_ignored() {
        let parsed = parse("Registrant Country: NL\nRegistrant Country:   ");
        assert_eq!(parsed.registrant_country.as_deref(), Some("NL"));
    }

    #[test]
    fn test_indented_lines_are_trimmed() {
        let parsed = parse("\t\t  country:   JP  \n");
        assert_eq!(parsed.registrant_country.as_deref(), Some("JP"));
    }

    #[test]
    fn test_every_field_has_a_matcher() {
        for field in Field::ALL {
            assert!(FIELD_MATCHERS.iter().any(|m| m.field == field));
        }
    }

    #[test]
    fn test_raw_record_blank() {
        assert!(RawRecord::new(" \n\t").is_blank());
        assert!(!RawRecord::new("x").is_blank());
    }
}
