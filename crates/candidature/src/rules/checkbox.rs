//! Checkbox rule: a boolean under `value["checked"]`.

use serde_json::Value;
use tracing::debug;

use super::{AssignContext, FieldRule};
use crate::input::FormInput;
use crate::model::Response;
use crate::validation::{ErrorCode, ErrorSet, ValidationContext};
use crate::value::{cast_boolean, BooleanCast, ValueMap};

pub const CHECKED_KEY: &str = "checked";

#[derive(Debug, Clone, Copy, Default)]
pub struct CheckboxRule;

/// Store a raw checkbox value using the permissive cast.
///
/// Unrecognized scalars are kept verbatim so validation can flag them.
fn store_cast(value: &mut ValueMap, raw: &Value) {
    match cast_boolean(raw) {
        BooleanCast::True => {
            value.insert(CHECKED_KEY.to_string(), Value::Bool(true));
        }
        BooleanCast::False => {
            value.insert(CHECKED_KEY.to_string(), Value::Bool(false));
        }
        BooleanCast::Absent => {
            value.remove(CHECKED_KEY);
        }
        BooleanCast::Unrecognized => {
            value.insert(CHECKED_KEY.to_string(), raw.clone());
        }
    }
}

/// Whether the checkbox currently reads as checked.
pub fn is_checked(value: &ValueMap) -> bool {
    value.get(CHECKED_KEY) == Some(&Value::Bool(true))
}

impl FieldRule for CheckboxRule {
    fn name(&self) -> &'static str {
        "checkbox"
    }

    fn assign(&self, response: &mut Response, input: &FormInput, _cx: &AssignContext<'_>) {
        if let Some(raw) = input.get(CHECKED_KEY).and_then(|v| v.as_scalar()) {
            store_cast(&mut response.value, raw);
        }
    }

    fn normalize(&self, response: &mut Response) {
        if let Some(raw) = response.value.get(CHECKED_KEY).cloned() {
            if !raw.is_boolean() {
                debug!(response = %response.id, "Casting stored checkbox value");
                store_cast(&mut response.value, &raw);
            }
        }
    }

    fn validate(&self, response: &Response, _cx: &ValidationContext<'_>, errors: &mut ErrorSet) {
        match response.value.get(CHECKED_KEY) {
            None | Some(Value::Bool(_)) => {}
            Some(_) => errors.add(
                CHECKED_KEY,
                ErrorCode::InvalidType,
                "checked must be a boolean",
            ),
        }
    }
}
