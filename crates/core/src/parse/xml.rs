use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{EngineError, Result};
use crate::value::{FieldMap, Value};

/// Parses XML into a generic nested-tag tree and selects the item
/// sequence. The `selector` tag is treated as repeatable, so a single
/// occurrence still yields a one-element sequence, and the sequence is
/// located by a depth-first search of the whole tree rather than at
/// the top level only.
pub(super) fn parse(content: &str, selector: &str) -> Result<Vec<Value>> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut stack = vec![PendingNode::new(String::new())];
    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(open_node(&start)?),
            Event::Empty(start) => {
                let (name, value) = finalize(open_node(&start)?);
                if let Some(parent) = stack.last_mut() {
                    attach(&mut parent.fields, name, value, selector);
                }
            }
            Event::End(_) => {
                let node = match stack.pop() {
                    Some(node) if !stack.is_empty() => node,
                    _ => {
                        return Err(EngineError::Xml(quick_xml::Error::UnexpectedEof(
                            "unbalanced close tag".to_string(),
                        )))
                    }
                };
                let (name, value) = finalize(node);
                if let Some(parent) = stack.last_mut() {
                    attach(&mut parent.fields, name, value, selector);
                }
            }
            Event::Text(text) => {
                let unescaped = text.unescape()?;
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&unescaped);
                }
            }
            Event::CData(cdata) => {
                let bytes = cdata.into_inner();
                if let Some(node) = stack.last_mut() {
                    node.cdata.push_str(&String::from_utf8_lossy(&bytes));
                }
            }
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    let root = match stack.pop() {
        Some(root) if stack.is_empty() => root,
        _ => {
            return Err(EngineError::Xml(quick_xml::Error::UnexpectedEof(
                "unclosed element".to_string(),
            )))
        }
    };
    let (_, document) = finalize(root);
    let document = collapse(document);
    let found = find_sequence(&document, selector)
        .ok_or_else(|| EngineError::SelectorNotFound(selector.to_string()))?;
    Ok(found.clone())
}

struct PendingNode {
    name: String,
    fields: FieldMap,
    text: String,
    cdata: String,
}

impl PendingNode {
    fn new(name: String) -> Self {
        Self {
            name,
            fields: FieldMap::new(),
            text: String::new(),
            cdata: String::new(),
        }
    }
}

fn open_node(start: &BytesStart<'_>) -> Result<PendingNode> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut node = PendingNode::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?;
        node.fields.insert(format!("@{key}"), coerce_scalar(value.trim()));
    }
    Ok(node)
}

/// Closes a node: attributes were inserted at open, accumulated text
/// and CDATA land under `#text` / `#cdata`. The wrapper collapse runs
/// later over the finished tree.
fn finalize(node: PendingNode) -> (String, Value) {
    let mut map = node.fields;
    let text = node.text.trim();
    if !text.is_empty() {
        map.insert("#text".to_string(), coerce_scalar(text));
    }
    if !node.cdata.is_empty() {
        map.insert("#cdata".to_string(), Value::Cdata(node.cdata));
    }
    (node.name, Value::Mapping(map))
}

/// Inserts a closed child under its tag name. Repeated names become a
/// sequence; the selector tag becomes a sequence even on its first
/// occurrence.
fn attach(map: &mut FieldMap, name: String, value: Value, selector: &str) {
    if let Some(existing) = map.get_mut(&name) {
        if let Value::Sequence(seq) = existing {
            seq.push(value);
        } else {
            let prev = std::mem::replace(existing, Value::Null);
            *existing = Value::Sequence(vec![prev, value]);
        }
    } else if name == selector {
        map.insert(name, Value::Sequence(vec![value]));
    } else {
        map.insert(name, value);
    }
}

/// Collapses trivial wrapper nodes: a mapping whose only member is
/// plain text or CDATA becomes that plain value, and an empty element
/// becomes an empty string.
fn collapse(value: Value) -> Value {
    match value {
        Value::Mapping(map) => {
            let map: FieldMap = map
                .into_iter()
                .map(|(key, nested)| (key, collapse(nested)))
                .collect();
            if map.is_empty() {
                return Value::Text(String::new());
            }
            if map.len() == 1 {
                let wrapper = matches!(
                    map.keys().next().map(String::as_str),
                    Some("#text") | Some("#cdata")
                );
                if wrapper {
                    return match map.into_iter().next() {
                        Some((_, inner)) => inner,
                        None => Value::Text(String::new()),
                    };
                }
            }
            Value::Mapping(map)
        }
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(collapse).collect()),
        other => other,
    }
}

/// Scalar coercion in the fast-xml-parser manner: bare booleans and
/// finite numbers take their typed form, everything else stays text.
fn coerce_scalar(text: &str) -> Value {
    match text {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    let numeric_start = text
        .chars()
        .next()
        .map(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.'))
        .unwrap_or(false);
    if numeric_start {
        if let Ok(number) = text.parse::<f64>() {
            if number.is_finite() {
                return Value::Number(number);
            }
        }
    }
    Value::Text(text.to_string())
}

fn find_sequence<'a>(value: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    match value {
        Value::Mapping(map) => {
            if let Some(Value::Sequence(seq)) = map.get(key) {
                return Some(seq);
            }
            map.values().find_map(|nested| find_sequence(nested, key))
        }
        Value::Sequence(seq) => seq.iter().find_map(|nested| find_sequence(nested, key)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect_mapping(value: &Value) -> &FieldMap {
        let Value::Mapping(map) = value else {
            panic!("expected mapping, got {value:?}");
        };
        map
    }

    #[test]
    fn repeatable_selector_with_coerced_scalars() {
        let items = parse(
            "<root><item><v>5</v></item><item><v>15</v></item></root>",
            "item",
        )
        .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(expect_mapping(&items[0]).get("v"), Some(&Value::Number(5.0)));
        assert_eq!(expect_mapping(&items[1]).get("v"), Some(&Value::Number(15.0)));
    }

    #[test]
    fn single_occurrence_is_forced_into_a_sequence() {
        let items = parse("<root><item><name>only</name></item></root>", "item").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(
            expect_mapping(&items[0]).get("name"),
            Some(&Value::Text("only".into()))
        );
    }

    #[test]
    fn selector_is_found_below_the_top_level() {
        let items = parse(
            "<feed><channel><entries><item><v>1</v></item></entries></channel></feed>",
            "item",
        )
        .unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn attributes_surface_as_at_keys() {
        let items = parse(
            r#"<root><item color="Blue" count="2"><v>1</v></item></root>"#,
            "item",
        )
        .unwrap();
        let map = expect_mapping(&items[0]);
        assert_eq!(map.get("@color"), Some(&Value::Text("Blue".into())));
        assert_eq!(map.get("@count"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn cdata_collapses_to_a_scalar_leaf() {
        let items = parse(
            "<root><item><desc><![CDATA[5 < 6 & true]]></desc></item></root>",
            "item",
        )
        .unwrap();
        assert_eq!(
            expect_mapping(&items[0]).get("desc"),
            Some(&Value::Cdata("5 < 6 & true".into()))
        );
    }

    #[test]
    fn repeated_child_tags_become_a_sequence() {
        let items = parse(
            "<root><item><tag>a</tag><tag>b</tag></item></root>",
            "item",
        )
        .unwrap();
        assert_eq!(
            expect_mapping(&items[0]).get("tag"),
            Some(&Value::Sequence(vec![
                Value::Text("a".into()),
                Value::Text("b".into())
            ]))
        );
    }

    #[test]
    fn entities_are_unescaped() {
        let items = parse("<root><item><v>a &amp; b</v></item></root>", "item").unwrap();
        assert_eq!(
            expect_mapping(&items[0]).get("v"),
            Some(&Value::Text("a & b".into()))
        );
    }

    #[test]
    fn empty_elements_become_empty_strings() {
        let items = parse("<root><item><v/></item></root>", "item").unwrap();
        assert_eq!(
            expect_mapping(&items[0]).get("v"),
            Some(&Value::Text(String::new()))
        );
    }

    #[test]
    fn missing_selector_is_an_error() {
        let err = parse("<root><thing/></root>", "item").unwrap_err();
        assert!(matches!(err, EngineError::SelectorNotFound(_)));
    }

    #[test]
    fn mismatched_tags_are_a_parse_error() {
        let err = parse("<root><item></root>", "item").unwrap_err();
        assert!(matches!(err, EngineError::Xml(_)));
    }
}
