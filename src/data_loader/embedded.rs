//! Decoding of embedded collection cells
//!
//! Cells in the `genres`, `keywords`, `production_companies`, `cast` and
//! `crew` columns hold a serialized list of mappings. Depending on how the
//! export was produced that text is strict JSON, JSON with single quotes, a
//! Python literal, or one of those with a stray trailing comma. The decoders
//! below are tried in order and the first one that yields a list of mappings
//! wins. When none does, the cell becomes an empty list.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;

use super::literal::parse_literal;
use crate::graph::Entry;

/// Columns of the joined table that hold embedded collections
pub const EMBEDDED_COLUMNS: [&str; 5] = ["genres", "keywords", "production_companies", "cast", "crew"];

static PYTHON_CONSTANT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(None|True|False)\b").expect("valid regex"));

static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([\]}])").expect("valid regex"));

type DecodeAttempt = fn(&str) -> Option<Value>;

/// Decoders in the order they are attempted
const DECODERS: &[(&str, DecodeAttempt)] = &[
    ("json", decode_strict_json),
    ("quote-normalized json", decode_quote_normalized),
    ("python literal", decode_literal),
    ("trailing-comma repaired json", decode_trailing_comma_repaired),
];

/// Outcome of decoding one cell
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A decoder accepted the text
    Parsed {
        entries: Vec<Entry>,
        decoder: &'static str,
    },
    /// The cell was blank or a null marker; nothing to parse
    Empty,
    /// Every decoder rejected the text
    Degraded,
}

impl Decoded {
    pub fn into_entries(self) -> Vec<Entry> {
        match self {
            Decoded::Parsed { entries, .. } => entries,
            Decoded::Empty | Decoded::Degraded => Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Decoded::Degraded)
    }
}

/// Run the decoder chain over one cell
pub fn decode_cell(raw: &str) -> Decoded {
    let text = raw.trim();
    if is_null_marker(text) {
        return Decoded::Empty;
    }

    DECODERS
        .iter()
        .find_map(|&(name, decode)| {
            decode(text)
                .and_then(into_entries)
                .map(|entries| Decoded::Parsed {
                    entries,
                    decoder: name,
                })
        })
        .unwrap_or(Decoded::Degraded)
}

/// Cell values pandas reads as missing
pub(crate) fn is_null_marker(text: &str) -> bool {
    matches!(text, "" | "NaN" | "nan" | "NULL" | "null" | "None" | "N/A" | "NA")
}

/// Only a list whose items are all mappings is an acceptable decode
fn into_entries(value: Value) -> Option<Vec<Entry>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

fn decode_strict_json(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

/// Swap single quotes for double quotes, then rewrite Python constants that
/// sit outside string values
fn normalize_quotes(text: &str) -> String {
    let swapped = text.replace('\'', "\"");
    let mut out = String::with_capacity(swapped.len());
    let mut segment_start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in swapped.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                out.push_str(&swapped[segment_start..=i]);
                segment_start = i + 1;
                in_string = false;
            }
        } else if c == '"' {
            out.push_str(&replace_constants(&swapped[segment_start..i]));
            segment_start = i;
            in_string = true;
        }
    }

    let rest = &swapped[segment_start..];
    if in_string {
        out.push_str(rest);
    } else {
        out.push_str(&replace_constants(rest));
    }
    out
}

fn replace_constants(code: &str) -> Cow<'_, str> {
    PYTHON_CONSTANT.replace_all(code, |caps: &regex::Captures| match &caps[1] {
        "None" => "null",
        "True" => "true",
        _ => "false",
    })
}

fn decode_quote_normalized(text: &str) -> Option<Value> {
    serde_json::from_str(&normalize_quotes(text)).ok()
}

fn decode_literal(text: &str) -> Option<Value> {
    parse_literal(text).ok()
}

fn decode_trailing_comma_repaired(text: &str) -> Option<Value> {
    let repaired = TRAILING_COMMA.replace_all(text, "$1");
    serde_json::from_str(&repaired)
        .or_else(|_| serde_json::from_str(&normalize_quotes(&repaired)))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decoder_of(raw: &str) -> Option<&'static str> {
        match decode_cell(raw) {
            Decoded::Parsed { decoder, .. } => Some(decoder),
            _ => None,
        }
    }

    #[test]
    fn test_strict_json_is_tried_first() {
        let decoded = decode_cell(r#"[{"id": 28, "name": "Action"}]"#);
        assert_eq!(decoder_of(r#"[{"id": 28, "name": "Action"}]"#), Some("json"));
        let entries = decoded.into_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["id"], json!(28));
        assert_eq!(entries[0]["name"], json!("Action"));
    }

    #[test]
    fn test_single_quotes_and_python_constants() {
        let raw = "[{'id': 1, 'name': 'x', 'profile_path': None}]";
        assert_eq!(decoder_of(raw), Some("quote-normalized json"));
        let entries = decode_cell(raw).into_entries();
        assert_eq!(entries[0]["profile_path"], Value::Null);
    }

    #[test]
    fn test_constants_inside_string_values_are_kept() {
        let raw = "[{'id': 1, 'name': 'None Shall Pass', 'adult': False}, {'id': 2, 'name': 'True Grit'}]";
        assert_eq!(decoder_of(raw), Some("quote-normalized json"));
        let entries = decode_cell(raw).into_entries();
        assert_eq!(entries[0]["name"], json!("None Shall Pass"));
        assert_eq!(entries[0]["adult"], json!(false));
        assert_eq!(entries[1]["name"], json!("True Grit"));
    }

    #[test]
    fn test_deeply_nested_text_degrades() {
        assert!(decode_cell(&"[".repeat(100_000)).is_degraded());
        assert!(decode_cell(&"[{'a': ".repeat(20_000)).is_degraded());
    }

    #[test]
    fn test_apostrophe_in_value_falls_through_to_literal() {
        let raw = r#"[{'character': "Ocean's Eleven", 'id': 1}]"#;
        assert_eq!(decoder_of(raw), Some("python literal"));
        let entries = decode_cell(raw).into_entries();
        assert_eq!(entries[0]["character"], json!("Ocean's Eleven"));
    }

    #[test]
    fn test_trailing_comma_with_json_null() {
        let raw = r#"[{"id": 1, "name": null,},]"#;
        assert_eq!(decoder_of(raw), Some("trailing-comma repaired json"));
        assert_eq!(decode_cell(raw).into_entries().len(), 1);
    }

    #[test]
    fn test_unparseable_text_degrades() {
        let decoded = decode_cell("[{'id': 1, 'name': ");
        assert!(decoded.is_degraded());
        assert!(decoded.into_entries().is_empty());
    }

    #[test]
    fn test_non_list_or_non_mapping_items_degrade() {
        assert!(decode_cell(r#"{"id": 1}"#).is_degraded());
        assert!(decode_cell("[1, 2, 3]").is_degraded());
    }

    #[test]
    fn test_blank_and_null_markers_are_empty() {
        assert_eq!(decode_cell(""), Decoded::Empty);
        assert_eq!(decode_cell("  NaN "), Decoded::Empty);
        assert_eq!(decode_cell("[]"), Decoded::Parsed { entries: vec![], decoder: "json" });
    }
}
