//! Radio rule: a `yes` / `no` token under `value["radio_choice"]`.

use serde_json::Value;

use super::{AssignContext, FieldRule};
use crate::input::FormInput;
use crate::model::Response;
use crate::validation::{ErrorCode, ErrorSet, ValidationContext};
use crate::value;

pub const RADIO_KEY: &str = "radio_choice";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioChoice {
    Yes,
    No,
}

impl RadioChoice {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "yes" => Some(RadioChoice::Yes),
            "no" => Some(RadioChoice::No),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RadioChoice::Yes => "yes",
            RadioChoice::No => "no",
        }
    }

    /// The recognized choice stored in a response, if any.
    pub fn of(response: &Response) -> Option<Self> {
        response
            .value
            .get(RADIO_KEY)
            .and_then(Value::as_str)
            .and_then(Self::parse)
    }
}

/// Canonical token for a recognized choice; anything else is kept as submitted.
fn canonical(raw: &str) -> String {
    match RadioChoice::parse(raw) {
        Some(choice) => choice.as_str().to_string(),
        None => raw.to_string(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RadioRule;

impl FieldRule for RadioRule {
    fn name(&self) -> &'static str {
        "radio"
    }

    fn assign(&self, response: &mut Response, input: &FormInput, _cx: &AssignContext<'_>) {
        let Some(raw) = input.get(RADIO_KEY).and_then(|v| v.as_scalar()) else {
            return;
        };
        match value::presence(raw) {
            Some(Value::String(s)) => {
                response.value.insert(RADIO_KEY.to_string(), Value::String(canonical(&s)));
            }
            Some(other) => {
                response.value.insert(RADIO_KEY.to_string(), other);
            }
            None => {
                response.value.remove(RADIO_KEY);
            }
        }
    }

    fn normalize(&self, response: &mut Response) {
        if let Some(Value::String(s)) = response.value.get_mut(RADIO_KEY) {
            *s = canonical(s);
        }
    }

    fn validate(&self, response: &Response, _cx: &ValidationContext<'_>, errors: &mut ErrorSet) {
        let Some(raw) = response.value.get(RADIO_KEY) else {
            return;
        };
        if value::is_blank(raw) {
            return;
        }
        let recognized = raw.as_str().and_then(RadioChoice::parse).is_some();
        if !recognized {
            errors.add(
                RADIO_KEY,
                ErrorCode::Inclusion,
                "radio_choice must be one of: yes, no",
            );
        }
    }
}
