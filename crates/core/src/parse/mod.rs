use std::fmt;
use std::path::Path;
use std::str::FromStr;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::value::{FieldMap, Item, Value};

mod json;
mod tabular;
mod xml;

/// Declared format of the source content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Xml,
    Json,
    Csv,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|s| s.to_lowercase());
        match ext.as_deref() {
            Some("xml") => Some(SourceFormat::Xml),
            Some("json") => Some(SourceFormat::Json),
            Some("csv") => Some(SourceFormat::Csv),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Xml => "xml",
            SourceFormat::Json => "json",
            SourceFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceFormat {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "xml" => Ok(SourceFormat::Xml),
            "json" => Ok(SourceFormat::Json),
            "csv" => Ok(SourceFormat::Csv),
            other => Err(EngineError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Per-source counters reported back with every load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMeta {
    /// Format-dependent: non-blank input lines for XML, data rows plus
    /// header for CSV, item count for JSON.
    pub lines_read: usize,
}

/// Parses `content` as `format` and returns the normalized item
/// collection. Items come back with contiguous indices from 0 and a
/// fresh surrogate id each.
pub fn parse(content: &str, format: SourceFormat, selector: &str) -> Result<(Vec<Item>, SourceMeta)> {
    let elements = match format {
        SourceFormat::Json => json::parse(content, selector)?,
        SourceFormat::Csv => tabular::parse(content)?,
        SourceFormat::Xml => xml::parse(content, selector)?,
    };
    let lines_read = match format {
        // JSON has no line-oriented semantics.
        SourceFormat::Json => elements.len(),
        SourceFormat::Csv => elements.len() + 1,
        SourceFormat::Xml => content.lines().filter(|line| !line.trim().is_empty()).count(),
    };
    Ok((normalize(elements), SourceMeta { lines_read }))
}

/// Wraps each parsed element into an [`Item`]. Elements that are not
/// mappings (a selected sequence may hold bare scalars) become a
/// single-field mapping under the key `value`.
fn normalize(elements: Vec<Value>) -> Vec<Item> {
    elements
        .into_iter()
        .enumerate()
        .map(|(index, element)| {
            let fields = match element {
                Value::Mapping(map) => map,
                other => {
                    let mut map = FieldMap::new();
                    map.insert("value".to_string(), other);
                    map
                }
            };
            Item {
                index,
                id: surrogate_id(index),
                fields,
            }
        })
        .collect()
}

/// Random 128-bit token; never collides within one parse batch. Falls
/// back to the deterministic `item-<index>` form when the OS entropy
/// source is unavailable.
fn surrogate_id(index: usize) -> String {
    let mut bytes = [0u8; 16];
    match OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => hex::encode(bytes),
        Err(_) => format!("item-{index}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn format_from_path_recognizes_extensions() {
        assert_eq!(
            SourceFormat::from_path(Path::new("data/items.JSON")),
            Some(SourceFormat::Json)
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("feed.xml")),
            Some(SourceFormat::Xml)
        );
        assert_eq!(SourceFormat::from_path(Path::new("notes.txt")), None);
    }

    #[test]
    fn unknown_format_name_is_rejected() {
        let err = "yaml".parse::<SourceFormat>().unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedFormat(_)));
    }

    #[test]
    fn normalize_assigns_contiguous_indices_and_unique_ids() {
        let (items, meta) = parse(r#"[{"a":1},{"a":2},{"a":3}]"#, SourceFormat::Json, "").unwrap();
        assert_eq!(meta.lines_read, 3);
        let indices: Vec<usize> = items.iter().map(|item| item.index).collect();
        assert_eq!(indices, [0, 1, 2]);
        let ids: HashSet<&str> = items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn scalar_elements_are_wrapped_under_value() {
        let (items, _) = parse("[1,2]", SourceFormat::Json, "").unwrap();
        assert_eq!(items[0].fields.get("value"), Some(&Value::Number(1.0)));
        assert_eq!(items[1].fields.get("value"), Some(&Value::Number(2.0)));
    }
}
