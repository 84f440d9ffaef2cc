use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::value::{FieldMap, Item, Value};

/// Derived, read-only snapshot of every field path observed across a
/// collection. Computed once per load; filtering and paging never
/// touch it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldAnalysis {
    /// All distinct paths, lexicographically sorted.
    pub fields: Vec<String>,
    /// Per path, the number of items in which it occurs at least once.
    pub counts: BTreeMap<String, usize>,
}

/// Single full pass over the collection. Each path is counted at most
/// once per item no matter how often it recurs structurally, and the
/// result is independent of the property order inside items.
pub fn analyze(items: &[Item]) -> FieldAnalysis {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for item in items {
        let mut in_item = BTreeSet::new();
        collect_paths(&item.fields, "", &mut in_item);
        for path in in_item {
            *counts.entry(path).or_insert(0) += 1;
        }
    }
    let fields = counts.keys().cloned().collect();
    FieldAnalysis { fields, counts }
}

/// The distinct path set of a whole collection, used by the filter
/// engine to decide which conditional filters are satisfiable.
pub(crate) fn path_set(items: &[Item]) -> BTreeSet<String> {
    let mut paths = BTreeSet::new();
    for item in items {
        collect_paths(&item.fields, "", &mut paths);
    }
    paths
}

/// Recursive walk over one mapping. Nested mappings extend the dotted
/// path; sequences are listed as a path of their own but their
/// elements are not expanded per index.
fn collect_paths(map: &FieldMap, prefix: &str, out: &mut BTreeSet<String>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if let Value::Mapping(nested) = value {
            collect_paths(nested, &path, out);
        }
        out.insert(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(index: usize, json: &str) -> Item {
        let parsed: serde_json::Value = serde_json::from_str(json).unwrap();
        let Value::Mapping(fields) = Value::from(parsed) else {
            panic!("test items must be objects");
        };
        Item {
            index,
            id: format!("item-{index}"),
            fields,
        }
    }

    #[test]
    fn paths_are_sorted_and_nested() {
        let items = vec![item(0, r#"{"name":"a","specifications":{"color":"Blue","size":2}}"#)];
        let analysis = analyze(&items);
        assert_eq!(
            analysis.fields,
            [
                "name",
                "specifications",
                "specifications.color",
                "specifications.size"
            ]
        );
    }

    #[test]
    fn counts_each_path_once_per_item() {
        let items = vec![
            item(0, r#"{"a":1,"b":{"c":2}}"#),
            item(1, r#"{"a":3}"#),
            item(2, r#"{"b":{"c":null}}"#),
        ];
        let analysis = analyze(&items);
        assert_eq!(analysis.counts["a"], 2);
        assert_eq!(analysis.counts["b"], 2);
        assert_eq!(analysis.counts["b.c"], 2);
    }

    #[test]
    fn sequences_are_listed_but_not_expanded() {
        let items = vec![item(0, r#"{"images":["x.png","y.png"],"tags":[{"k":1}]}"#)];
        let analysis = analyze(&items);
        assert_eq!(analysis.fields, ["images", "tags"]);
    }

    #[test]
    fn deterministic_regardless_of_property_order() {
        let forward = vec![item(0, r#"{"a":1,"b":2}"#)];
        let reversed = vec![item(0, r#"{"b":2,"a":1}"#)];
        assert_eq!(analyze(&forward), analyze(&reversed));
    }

    #[test]
    fn empty_collection_yields_empty_analysis() {
        assert_eq!(analyze(&[]), FieldAnalysis::default());
    }
}
