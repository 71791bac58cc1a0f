use chrono::{NaiveDate, NaiveDateTime};

use crate::constants::NULL_SENTINELS;
use crate::types::Gender;

/// A birth date as it arrives from a source: already typed, or free text
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawDate<'a> {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Text(&'a str),
}

/// A list-valued field: either already split or a delimited string
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawList<'a> {
    Items(&'a [String]),
    Text(&'a str),
}

/// A numeric field before coercion
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawNumber<'a> {
    Int(i64),
    Float(f64),
    Text(&'a str),
}

pub fn is_null_sentinel(value: &str) -> bool {
    NULL_SENTINELS.contains(&value.trim())
}

/// Canonical `YYYY-MM-DD` for typed dates; known null markers become `None`.
///
/// Other text is passed through as-is, parseable or not.
pub fn format_date(raw: Option<RawDate<'_>>) -> Option<String> {
    match raw? {
        RawDate::Date(date) => Some(date.format("%Y-%m-%d").to_string()),
        RawDate::DateTime(dt) => Some(dt.date().format("%Y-%m-%d").to_string()),
        RawDate::Text(text) => {
            let trimmed = text.trim();
            if is_null_sentinel(trimmed) {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
    }
}

fn push_unique(out: &mut Vec<String>, token: &str) {
    let token = token.trim();
    if !token.is_empty() && !out.iter().any(|t| t == token) {
        out.push(token.to_string());
    }
}

/// Split a list field into trimmed, de-duplicated tokens in first-seen order.
///
/// Delimiter precedence for text: `;`, then `|`, then `,`.
pub fn parse_list(raw: Option<RawList<'_>>) -> Vec<String> {
    let mut out = Vec::new();
    match raw {
        None => {}
        Some(RawList::Items(items)) => {
            for item in items {
                push_unique(&mut out, item);
            }
        }
        Some(RawList::Text(text)) => {
            let text = text.trim();
            if is_null_sentinel(text) {
                return out;
            }
            let delimiter = if text.contains(';') {
                ';'
            } else if text.contains('|') {
                '|'
            } else {
                ','
            };
            for part in text.split(delimiter) {
                push_unique(&mut out, part);
            }
        }
    }
    out
}

fn coerce_integer(raw: RawNumber<'_>) -> Option<i64> {
    match raw {
        RawNumber::Int(n) => Some(n),
        RawNumber::Float(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Some(f.trunc() as i64),
        RawNumber::Float(_) => None,
        RawNumber::Text(text) => {
            let text = text.trim();
            text.parse::<i64>().ok().or_else(|| {
                text.parse::<f64>()
                    .ok()
                    .and_then(|f| coerce_integer(RawNumber::Float(f)))
            })
        }
    }
}

/// Coerce `net_worth` / `height_cm`. Zero is a placeholder and, like
/// negatives and junk, maps to `None`.
pub fn coerce_positive(raw: Option<RawNumber<'_>>) -> Option<u64> {
    raw.and_then(coerce_integer)
        .filter(|n| *n > 0)
        .map(|n| n as u64)
}

/// Coerce `sitelinks`, which defaults to 0 instead of being absent.
pub fn coerce_sitelinks(raw: Option<RawNumber<'_>>) -> u64 {
    raw.and_then(coerce_integer)
        .filter(|n| *n > 0)
        .map(|n| n as u64)
        .unwrap_or(0)
}

pub fn normalize_gender(raw: Option<&str>) -> Option<Gender> {
    match raw?.trim().to_lowercase().as_str() {
        "male" => Some(Gender::Male),
        "female" => Some(Gender::Female),
        "non-binary" => Some(Gender::NonBinary),
        "other" => Some(Gender::Other),
        _ => None,
    }
}
