use std::collections::BTreeSet;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::fields;
use crate::value::{Item, Value};

/// Comparison operator of a conditional filter. The set is closed: an
/// operator name outside it fails validation at the boundary instead
/// of silently matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterCondition {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
    GreaterThan,
    LessThan,
}

impl FromStr for FilterCondition {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw {
            "equals" => Ok(FilterCondition::Equals),
            "notEquals" => Ok(FilterCondition::NotEquals),
            "contains" => Ok(FilterCondition::Contains),
            "notContains" => Ok(FilterCondition::NotContains),
            "startsWith" => Ok(FilterCondition::StartsWith),
            "endsWith" => Ok(FilterCondition::EndsWith),
            "isEmpty" => Ok(FilterCondition::IsEmpty),
            "isNotEmpty" => Ok(FilterCondition::IsNotEmpty),
            "greaterThan" => Ok(FilterCondition::GreaterThan),
            "lessThan" => Ok(FilterCondition::LessThan),
            other => Err(EngineError::UnknownCondition(other.to_string())),
        }
    }
}

/// One field + operator + value predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalFilter {
    #[serde(default)]
    pub id: String,
    pub field: String,
    pub condition: FilterCondition,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterLogic {
    #[default]
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

/// The complete description of the current view's filtering criteria.
/// Replaced atomically on every refine; never merged with a previous
/// set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppliedFilters {
    pub search_term: String,
    pub hidden_fields: BTreeSet<String>,
    pub show_empty_fields: bool,
    pub conditional_filters: Vec<ConditionalFilter>,
    pub filter_logic: FilterLogic,
    /// Visible field paths as supplied by the caller; search derives
    /// its top-level field list from these. Absent means all top-level
    /// keys are searchable.
    pub all_fields: Option<Vec<String>>,
}

/// The no-op filter set: everything visible, nothing filtered.
impl Default for AppliedFilters {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            hidden_fields: BTreeSet::new(),
            show_empty_fields: true,
            conditional_filters: Vec::new(),
            filter_logic: FilterLogic::And,
            all_fields: None,
        }
    }
}

/// Evaluates the filter set against the raw collection. Pure: `items`
/// is never mutated, and the result preserves the input order.
///
/// A conditional filter naming a field that exists nowhere in the
/// (non-hidden) field set makes the whole request unsatisfiable and
/// yields an empty result, even under OR logic. This strictness is an
/// intentional part of the contract.
pub fn apply_filters(items: &[Item], filters: &AppliedFilters) -> Vec<Item> {
    let all_paths = fields::path_set(items);
    let active: BTreeSet<&str> = all_paths
        .iter()
        .map(String::as_str)
        .filter(|path| !filters.hidden_fields.contains(*path))
        .collect();

    let unsatisfiable = filters
        .conditional_filters
        .iter()
        .any(|filter| !filter.field.is_empty() && !active.contains(filter.field.as_str()));
    if unsatisfiable {
        return Vec::new();
    }

    let mut filtered: Vec<Item> = items.to_vec();

    if !filters.conditional_filters.is_empty() {
        filtered.retain(|item| {
            let mut results = filters.conditional_filters.iter().map(|filter| {
                // Hidden or empty fields make the predicate vacuously true.
                if filter.field.is_empty() || filters.hidden_fields.contains(&filter.field) {
                    return true;
                }
                check_condition(item.field_at(&filter.field), filter.condition, &filter.value)
            });
            match filters.filter_logic {
                FilterLogic::And => results.all(|matched| matched),
                FilterLogic::Or => results.any(|matched| matched),
            }
        });
    }

    if !filters.show_empty_fields {
        filtered.retain(|item| {
            item.fields
                .iter()
                .any(|(key, value)| !filters.hidden_fields.contains(key) && !value.is_blank())
        });
    }

    if !filters.search_term.is_empty() {
        let term = filters.search_term.to_lowercase();
        let top_level: Option<Vec<&str>> = filters.all_fields.as_ref().map(|paths| {
            paths
                .iter()
                .map(|path| match path.split_once('.') {
                    Some((head, _)) => head,
                    None => path.as_str(),
                })
                .unique()
                .collect()
        });
        filtered.retain(|item| match &top_level {
            Some(keys) => keys.iter().any(|key| {
                item.fields
                    .get(*key)
                    .map(|value| has_search_term(value, &term))
                    .unwrap_or(false)
            }),
            None => item.fields.values().any(|value| has_search_term(value, &term)),
        });
    }

    filtered
}

/// Deep, case-insensitive containment check. Recurses through
/// sequences and mappings; CDATA leaves are scalars and are matched on
/// their text.
fn has_search_term(value: &Value, lower_term: &str) -> bool {
    match value {
        Value::Null => false,
        Value::Sequence(seq) => seq.iter().any(|nested| has_search_term(nested, lower_term)),
        Value::Mapping(map) => map.values().any(|nested| has_search_term(nested, lower_term)),
        scalar => scalar.to_string().to_lowercase().contains(lower_term),
    }
}

/// Evaluates one condition against one resolved value. `None` stands
/// for a missing field and behaves like an explicit null.
fn check_condition(value: Option<&Value>, condition: FilterCondition, target: &str) -> bool {
    let value = match value {
        None | Some(Value::Null) => {
            return match condition {
                FilterCondition::IsEmpty => true,
                FilterCondition::IsNotEmpty => false,
                FilterCondition::Equals => target == "null",
                _ => false,
            }
        }
        Some(value) => value,
    };

    match value {
        Value::Sequence(seq) => {
            let contained = || {
                let target = target.to_lowercase();
                seq.iter()
                    .any(|element| element.to_string().to_lowercase().contains(&target))
            };
            match condition {
                FilterCondition::Contains => contained(),
                FilterCondition::NotContains => !contained(),
                FilterCondition::IsEmpty => seq.is_empty(),
                FilterCondition::IsNotEmpty => !seq.is_empty(),
                FilterCondition::Equals => value.to_canonical_json() == target,
                _ => false,
            }
        }
        Value::Mapping(map) => {
            let contained = || {
                let target = target.to_lowercase();
                map.values()
                    .any(|nested| nested.to_string().to_lowercase().contains(&target))
            };
            match condition {
                FilterCondition::Contains => contained(),
                FilterCondition::NotContains => !contained(),
                FilterCondition::IsEmpty => map.is_empty(),
                FilterCondition::IsNotEmpty => !map.is_empty(),
                FilterCondition::Equals => {
                    value.to_canonical_json().to_lowercase() == target.to_lowercase()
                }
                _ => false,
            }
        }
        scalar => {
            let text = scalar.to_string().to_lowercase();
            let lower_target = target.to_lowercase();
            match condition {
                FilterCondition::Equals => text == lower_target,
                FilterCondition::NotEquals => text != lower_target,
                FilterCondition::Contains => text.contains(&lower_target),
                FilterCondition::NotContains => !text.contains(&lower_target),
                FilterCondition::StartsWith => text.starts_with(&lower_target),
                FilterCondition::EndsWith => text.ends_with(&lower_target),
                FilterCondition::IsEmpty => text.is_empty(),
                FilterCondition::IsNotEmpty => !text.is_empty(),
                FilterCondition::GreaterThan | FilterCondition::LessThan => {
                    let left = scalar
                        .as_number()
                        .or_else(|| parse_float_prefix(&scalar.to_string()));
                    match (left, parse_float_prefix(target)) {
                        (Some(left), Some(right)) => match condition {
                            FilterCondition::GreaterThan => left > right,
                            _ => left < right,
                        },
                        _ => false,
                    }
                }
            }
        }
    }
}

/// Loose float parsing: the longest valid leading float prefix of the
/// trimmed input (sign, decimal point, exponent). No digits, no
/// number.
fn parse_float_prefix(raw: &str) -> Option<f64> {
    let text = raw.trim();
    let bytes = text.as_bytes();
    let mut pos = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        pos = 1;
    }
    let mut digits = 0;
    while matches!(bytes.get(pos), Some(c) if c.is_ascii_digit()) {
        pos += 1;
        digits += 1;
    }
    if bytes.get(pos) == Some(&b'.') {
        let mut frac_end = pos + 1;
        let mut frac_digits = 0;
        while matches!(bytes.get(frac_end), Some(c) if c.is_ascii_digit()) {
            frac_end += 1;
            frac_digits += 1;
        }
        if digits + frac_digits > 0 {
            pos = frac_end;
            digits += frac_digits;
        }
    }
    if digits == 0 {
        return None;
    }
    let mut end = pos;
    if matches!(bytes.get(pos), Some(b'e') | Some(b'E')) {
        let mut exp_end = pos + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let mut exp_digits = 0;
        while matches!(bytes.get(exp_end), Some(c) if c.is_ascii_digit()) {
            exp_end += 1;
            exp_digits += 1;
        }
        if exp_digits > 0 {
            end = exp_end;
        }
    }
    text[..end].parse().ok()
}
