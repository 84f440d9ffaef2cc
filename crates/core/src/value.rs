use std::fmt;

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::Serialize;

/// Ordered field name → value mapping, the body of an [`Item`].
pub type FieldMap = IndexMap<String, Value>;

/// Largest float that still maps to an exact integer (2^53 - 1).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A parsed data value. The set of shapes is closed: every recursive
/// algorithm in the engine (field discovery, search, condition
/// evaluation) matches over it exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    /// CDATA section lifted out of XML. Behaves as a scalar everywhere:
    /// search and condition evaluation never recurse into it.
    Cdata(String),
    Sequence(Vec<Value>),
    Mapping(FieldMap),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Canonical JSON rendering, used wherever a whole sequence or
    /// mapping is compared against a filter target.
    pub fn to_canonical_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("null"))
    }

    /// A value that contributes nothing visible to an item: null, a
    /// blank string, or a container with no members.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(text) | Value::Cdata(text) => text.trim().is_empty(),
            Value::Sequence(seq) => seq.is_empty(),
            Value::Mapping(map) => map.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        }
    }
}

fn as_integer(n: f64) -> Option<i64> {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        Some(n as i64)
    } else {
        None
    }
}

/// String form used by comparisons and search. Scalars render bare
/// (no quotes, integers without a trailing `.0`); sequences and
/// mappings render as canonical JSON.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => match as_integer(*n) {
                Some(i) => write!(f, "{i}"),
                None => write!(f, "{n}"),
            },
            Value::Text(text) | Value::Cdata(text) => f.write_str(text),
            Value::Sequence(_) | Value::Mapping(_) => f.write_str(&self.to_canonical_json()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => match as_integer(*n) {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_f64(*n),
            },
            Value::Text(text) | Value::Cdata(text) => serializer.serialize_str(text),
            Value::Sequence(seq) => {
                let mut out = serializer.serialize_seq(Some(seq.len()))?;
                for value in seq {
                    out.serialize_element(value)?;
                }
                out.end()
            }
            Value::Mapping(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::Sequence(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Mapping(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

/// One record of the parsed collection, the atomic unit of filtering
/// and paging. Position and identity live outside the field mapping so
/// user data never has to carry reserved keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    /// Zero-based position in the originally parsed sequence.
    pub index: usize,
    /// Opaque identity, stable across filtering and paging within one
    /// load generation.
    pub id: String,
    pub fields: FieldMap,
}

impl Item {
    /// Resolves a dotted field path by walking successive mapping keys
    /// from the item root. Any missing intermediate yields `None`.
    pub fn field_at(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.fields.get(segments.next()?)?;
        for segment in segments {
            match current {
                Value::Mapping(map) => current = map.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(entries: &[(&str, Value)]) -> Value {
        Value::Mapping(
            entries
                .iter()
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect(),
        )
    }

    #[test]
    fn display_matches_loose_string_form() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Number(1.0).to_string(), "1");
        assert_eq!(Value::Number(1.5).to_string(), "1.5");
        assert_eq!(Value::Text("Blue".into()).to_string(), "Blue");
    }

    #[test]
    fn canonical_json_keeps_integer_numbers_bare() {
        let value = Value::Sequence(vec![Value::Number(2.0), Value::Text("x".into())]);
        assert_eq!(value.to_canonical_json(), r#"[2,"x"]"#);
    }

    #[test]
    fn canonical_json_preserves_mapping_order() {
        let value = mapping(&[("b", Value::Number(1.0)), ("a", Value::Number(2.0))]);
        assert_eq!(value.to_canonical_json(), r#"{"b":1,"a":2}"#);
    }

    #[test]
    fn from_json_keeps_object_order() {
        let parsed: serde_json::Value = serde_json::from_str(r#"{"z":1,"a":{"k":[true,null]}}"#).unwrap();
        let value = Value::from(parsed);
        let Value::Mapping(map) = &value else {
            panic!("expected mapping");
        };
        let keys: Vec<&String> = map.keys().collect();
        assert_eq!(keys, ["z", "a"]);
        assert_eq!(value.to_canonical_json(), r#"{"z":1,"a":{"k":[true,null]}}"#);
    }

    #[test]
    fn field_at_walks_nested_mappings() {
        let item = Item {
            index: 0,
            id: "id-0".into(),
            fields: [(
                "specifications".to_string(),
                mapping(&[("color", Value::Text("Blue".into()))]),
            )]
            .into_iter()
            .collect(),
        };
        assert_eq!(
            item.field_at("specifications.color"),
            Some(&Value::Text("Blue".into()))
        );
        assert_eq!(item.field_at("specifications.weight"), None);
        assert_eq!(item.field_at("specifications.color.hue"), None);
    }

    #[test]
    fn blank_values() {
        assert!(Value::Null.is_blank());
        assert!(Value::Text("  ".into()).is_blank());
        assert!(Value::Sequence(vec![]).is_blank());
        assert!(Value::Mapping(FieldMap::new()).is_blank());
        assert!(!Value::Bool(false).is_blank());
        assert!(!Value::Number(0.0).is_blank());
    }
}
