use crate::error::{EngineError, Result};
use crate::value::Value;

/// Parses the whole text as one JSON value and selects the item array.
/// With an empty selector the top-level value must itself be an array;
/// otherwise a depth-first search locates the first property named
/// exactly `selector` whose value is an array, in document order.
pub(super) fn parse(content: &str, selector: &str) -> Result<Vec<Value>> {
    if content.trim_start().starts_with('<')
        && (content.contains("<!DOCTYPE") || content.contains("<html"))
    {
        return Err(EngineError::MarkupNotJson);
    }
    let parsed: serde_json::Value = serde_json::from_str(content)?;
    let selected = if selector.trim().is_empty() {
        match parsed {
            serde_json::Value::Array(items) => items,
            _ => return Err(EngineError::TopLevelNotArray),
        }
    } else {
        find_array(&parsed, selector)
            .ok_or_else(|| EngineError::SelectorNotFound(selector.to_string()))?
            .clone()
    };
    Ok(selected.into_iter().map(Value::from).collect())
}

fn find_array<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a Vec<serde_json::Value>> {
    match value {
        serde_json::Value::Array(items) => items.iter().find_map(|item| find_array(item, key)),
        serde_json::Value::Object(map) => {
            for (name, nested) in map {
                if name == key {
                    if let serde_json::Value::Array(found) = nested {
                        return Some(found);
                    }
                }
                if let Some(found) = find_array(nested, key) {
                    return Some(found);
                }
            }
            None
        }
        _ => None,
    }
}
