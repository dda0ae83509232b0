//! Schema-shape rule.
//!
//! Rejects keys outside the variant's allow-list and, for manual answers to
//! mandatory attributes, requires the declared keys to be present and
//! non-blank. Auto-filled partial data is exempt from the required check.

use super::{FieldRule, Stage};
use crate::model::Response;
use crate::validation::{ErrorCode, ErrorSet, ValidationContext};
use crate::value;

#[derive(Debug, Clone, Copy)]
pub struct SchemaRule {
    pub allowed: &'static [&'static str],
    pub required: &'static [&'static str],
    /// Field the errors are reported on.
    pub error_field: &'static str,
}

impl SchemaRule {
    pub const fn new(allowed: &'static [&'static str], error_field: &'static str) -> Self {
        Self {
            allowed,
            required: &[],
            error_field,
        }
    }

    pub const fn requiring(mut self, required: &'static [&'static str]) -> Self {
        self.required = required;
        self
    }
}

impl FieldRule for SchemaRule {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn stage(&self) -> Stage {
        Stage::Shape
    }

    fn validate(&self, response: &Response, cx: &ValidationContext<'_>, errors: &mut ErrorSet) {
        for key in response.value.keys() {
            if !self.allowed.contains(&key.as_str()) {
                errors.add(
                    self.error_field,
                    ErrorCode::AdditionalProperties,
                    format!("{} is not an allowed property", key),
                );
            }
        }

        if !cx.requires_answer(response) {
            return;
        }
        for key in self.required {
            if !value::is_present(&response.value, key) {
                errors.add(
                    self.error_field,
                    ErrorCode::Required,
                    format!("{} is required", key),
                );
            }
        }
    }
}
