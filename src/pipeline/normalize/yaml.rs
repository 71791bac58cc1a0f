//! Lenient readers for hand-edited YAML header values.

use serde_yaml::Value;
use std::collections::BTreeMap;

use super::fields::{RawList, RawNumber};

/// Strings, numbers and booleans as text; anything else is `None`.
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_string(&tagged.value),
        _ => None,
    }
}

/// Like [`scalar_string`] but blank text is treated as missing.
pub fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(scalar_string)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn raw_number(value: &Value) -> Option<RawNumber<'_>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(RawNumber::Int)
            .or_else(|| n.as_f64().map(RawNumber::Float)),
        Value::String(s) => Some(RawNumber::Text(s)),
        Value::Tagged(tagged) => raw_number(&tagged.value),
        _ => None,
    }
}

/// Sequences become owned items so the caller can borrow them as a `RawList`.
pub enum ListSource<'a> {
    Items(Vec<String>),
    Text(&'a str),
    Missing,
}

impl<'a> ListSource<'a> {
    pub fn from_value(value: Option<&'a Value>) -> Self {
        match value {
            Some(Value::Sequence(seq)) => {
                ListSource::Items(seq.iter().filter_map(scalar_string).collect())
            }
            Some(Value::String(s)) => ListSource::Text(s),
            Some(other) => match scalar_string(other) {
                Some(text) => ListSource::Items(vec![text]),
                None => ListSource::Missing,
            },
            None => ListSource::Missing,
        }
    }

    pub fn as_raw(&self) -> Option<RawList<'_>> {
        match self {
            ListSource::Items(items) => Some(RawList::Items(items)),
            ListSource::Text(text) => Some(RawList::Text(text)),
            ListSource::Missing => None,
        }
    }
}

/// Convert a YAML value into JSON. Values JSON cannot hold (a mapping with
/// a sequence as key, for one) become `null`.
pub fn to_json(value: &Value) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

/// A YAML mapping as a JSON object map; anything else gives an empty map.
pub fn to_json_map(value: Option<&Value>) -> BTreeMap<String, serde_json::Value> {
    match value.map(to_json) {
        Some(serde_json::Value::Object(map)) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    }
}
