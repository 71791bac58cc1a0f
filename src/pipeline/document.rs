//! Structured document format: a `---` fenced YAML header and a Markdown body.

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::error::{PipelineError, Result};

const FENCE: &str = "---";

/// Render a header and body as a structured document.
pub fn render<T: Serialize>(header: &T, body: &str) -> Result<String> {
    let yaml = serde_yaml::to_string(header)?;
    let mut out = String::with_capacity(yaml.len() + body.len() + 16);
    out.push_str(FENCE);
    out.push('\n');
    out.push_str(&yaml);
    if !yaml.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(FENCE);
    out.push_str("\n\n");
    out.push_str(body);
    Ok(out)
}

/// Split a document into its raw YAML header and body.
///
/// `None` when the text does not open with a fence or the fence is never closed.
pub fn split(text: &str) -> Option<(&str, &str)> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut lines = text.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != FENCE {
        return None;
    }

    let header_start = first.len();
    let mut offset = header_start;
    for line in lines {
        if line.trim_end() == FENCE {
            let header = &text[header_start..offset];
            let body = &text[offset + line.len()..];
            return Some((header, body));
        }
        offset += line.len();
    }
    None
}

/// A parsed document: header mapping plus Markdown body
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub header: Mapping,
    pub body: String,
}

impl Document {
    /// Parse a document. Text without a header yields an empty mapping and the
    /// whole text as body; a header that is not a YAML mapping is an error.
    pub fn parse(text: &str) -> Result<Self> {
        let Some((raw_header, body)) = split(text) else {
            return Ok(Self {
                header: Mapping::new(),
                body: text.to_string(),
            });
        };

        let header = match serde_yaml::from_str::<Value>(raw_header)? {
            Value::Mapping(map) => map,
            Value::Null => Mapping::new(),
            other => {
                return Err(PipelineError::Document(format!(
                    "front matter is not a mapping (found {})",
                    value_kind(&other)
                )))
            }
        };

        Ok(Self {
            header,
            body: body.to_string(),
        })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.header.get(key).filter(|v| !v.is_null())
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_render_layout() {
        let mut header = BTreeMap::new();
        header.insert("fpid", "FP-1815-ada-lovelace");
        let doc = render(&header, "# Notes\n").unwrap();
        assert_eq!(doc, "---\nfpid: FP-1815-ada-lovelace\n---\n\n# Notes\n");
    }

    #[test]
    fn test_split_handles_crlf_and_bom() {
        let text = "\u{feff}---\r\nfpid: FP-1\r\n---\r\n\r\nbody\r\n";
        let (header, body) = split(text).unwrap();
        assert_eq!(header, "fpid: FP-1\r\n");
        assert_eq!(body, "\r\nbody\r\n");
    }

    #[test]
    fn test_split_requires_opening_and_closing_fence() {
        assert!(split("no header here").is_none());
        assert!(split("---\nfpid: FP-1\nnever closed\n").is_none());
        assert!(split("---\n---\n").is_some());
    }

    #[test]
    fn test_parse_document() {
        let doc = Document::parse("---\nfpid: FP-1\nmbti: ~\n---\n\n# Notes\n").unwrap();
        assert_eq!(doc.get("fpid"), Some(&Value::String("FP-1".into())));
        assert_eq!(doc.get("mbti"), None);
        assert_eq!(doc.body, "\n# Notes\n");
    }

    #[test]
    fn test_parse_without_header_is_empty() {
        let doc = Document::parse("# Just notes\n").unwrap();
        assert!(doc.header.is_empty());
        assert_eq!(doc.body, "# Just notes\n");
    }

    #[test]
    fn test_parse_rejects_non_mapping_header() {
        assert!(Document::parse("---\n- a\n- b\n---\n").is_err());
        assert!(Document::parse("---\nfpid: [unclosed\n---\n").is_err());
    }
}
