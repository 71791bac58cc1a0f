use serde_yaml::Value;

use super::yaml::{non_empty_string, scalar_string, to_json};
use crate::constants::UNKNOWN_RELATION;
use crate::types::{RelationshipDetails, RelationshipRow};

/// Remove wiki-link markup (`[[FP-1815-ada-lovelace]]`) from a target reference.
pub fn strip_link_markup(target: &str) -> String {
    target.replace("[[", "").replace("]]", "").trim().to_string()
}

/// Turn a header `relationships` value into rows owned by `source_fpid`.
///
/// Entries that are not mappings or have no usable target are dropped.
pub fn normalize_relationships(source_fpid: &str, value: Option<&Value>) -> Vec<RelationshipRow> {
    let Some(Value::Sequence(entries)) = value else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let Value::Mapping(map) = entry else {
                return None;
            };

            let target = map.get("target").and_then(scalar_string)?;
            let target = strip_link_markup(&target);
            if target.is_empty() {
                return None;
            }

            let relation_type =
                non_empty_string(map.get("type")).unwrap_or_else(|| UNKNOWN_RELATION.to_string());
            let years = map.get("years").map(to_json).unwrap_or(serde_json::Value::Null);

            Some(RelationshipRow {
                source_fpid: source_fpid.to_string(),
                target_fpid: target,
                relation_type,
                details: RelationshipDetails { years },
            })
        })
        .collect()
}
