//! Value container helpers.
//!
//! Every response owns a JSON object (`ValueMap`). Its shape depends on the
//! variant, but blankness, presence normalization, and boolean casting are
//! shared by all rules and live here.

use serde_json::{Map, Value};

/// The semi-structured value owned by a response.
pub type ValueMap = Map<String, Value>;

/// Whether a value carries no answer.
///
/// - `null`: blank
/// - strings: blank when empty or whitespace-only
/// - arrays: blank when empty
/// - objects: blank when every member is blank (so a fully blank year slot
///   or item is blank)
/// - booleans and numbers: never blank (`false` is an answer)
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.values().all(is_blank),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Whether every member of a value map is blank.
pub fn is_map_blank(map: &ValueMap) -> bool {
    map.values().all(is_blank)
}

/// Returns the value unless it is blank.
pub fn presence(value: &Value) -> Option<Value> {
    if is_blank(value) {
        None
    } else {
        Some(value.clone())
    }
}

/// Whether a key is present with a non-blank value.
pub fn is_present(map: &ValueMap, key: &str) -> bool {
    map.get(key).is_some_and(|v| !is_blank(v))
}

/// Outcome of the permissive boolean cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanCast {
    True,
    False,
    /// Empty string or null: the key should be dropped.
    Absent,
    /// Not a boolean-like scalar; kept as-is so validation can report it.
    Unrecognized,
}

/// Cast a scalar the way form checkboxes submit them.
///
/// `"1"`, `"true"`, `"yes"`, `"on"` are true; `"0"`, `"false"`, `"no"`,
/// `"off"` are false; `""` and `null` are absent. Comparison ignores case and
/// surrounding whitespace.
pub fn cast_boolean(value: &Value) -> BooleanCast {
    match value {
        Value::Bool(true) => BooleanCast::True,
        Value::Bool(false) => BooleanCast::False,
        Value::Null => BooleanCast::Absent,
        Value::Number(n) => match n.as_i64() {
            Some(1) => BooleanCast::True,
            Some(0) => BooleanCast::False,
            _ => BooleanCast::Unrecognized,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => BooleanCast::True,
            "0" | "false" | "no" | "off" => BooleanCast::False,
            "" => BooleanCast::Absent,
            _ => BooleanCast::Unrecognized,
        },
        Value::Array(_) | Value::Object(_) => BooleanCast::Unrecognized,
    }
}

/// Truthiness used by flags such as `_destroy`.
pub fn is_truthy(value: &Value) -> bool {
    cast_boolean(value) == BooleanCast::True
}

/// Parse a non-negative integer from a JSON number or a digit string.
pub fn as_non_negative_integer(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
                trimmed.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    }
}
