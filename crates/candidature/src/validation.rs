//! Validation results.
//!
//! A validation pass produces an [`ErrorSet`]: field name → ordered list of
//! [`FieldError`]s. Field names are either value keys (`text`, `checked`,
//! `radio_choice`), the attachment slot (`documents`), the repeatable item
//! collection (`items`), or `value` for whole-blob errors.
//!
//! Errors carry a structured [`ErrorCode`] plus an English message. Rendering
//! localized labels is the form layer's job; it should key off the code.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::model::Response;

/// Machine-readable error classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Structural
    Required,
    AdditionalProperties,
    InvalidType,
    // Semantic
    Invalid,
    TooLong,
    Format,
    Inclusion,
    OutOfRange,
    NotAPositiveInteger,
    InvalidDate,
    WrongDateFormat,
    // Cross-field
    DocumentRequired,
    DocumentNotAllowedUnlessChecked,
    NotAllowedForChoice,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Required => "required",
            ErrorCode::AdditionalProperties => "additional_properties",
            ErrorCode::InvalidType => "invalid_type",
            ErrorCode::Invalid => "invalid",
            ErrorCode::TooLong => "too_long",
            ErrorCode::Format => "format",
            ErrorCode::Inclusion => "inclusion",
            ErrorCode::OutOfRange => "out_of_range",
            ErrorCode::NotAPositiveInteger => "not_a_positive_integer",
            ErrorCode::InvalidDate => "invalid_date",
            ErrorCode::WrongDateFormat => "wrong_date_format",
            ErrorCode::DocumentRequired => "document_required",
            ErrorCode::DocumentNotAllowedUnlessChecked => "document_not_allowed_unless_checked",
            ErrorCode::NotAllowedForChoice => "not_allowed_for_choice",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One error attached to a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub code: ErrorCode,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Field-keyed errors from one validation pass.
///
/// Built fresh on every pass; nothing is carried over between passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorSet {
    errors: BTreeMap<String, Vec<FieldError>>,
}

impl ErrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, code: ErrorCode, message: impl Into<String>) {
        self.errors.entry(field.into()).or_default().push(FieldError {
            code,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total number of errors across all fields.
    pub fn len(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    pub fn get(&self, field: &str) -> &[FieldError] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn messages(&self, field: &str) -> Vec<&str> {
        self.get(field).iter().map(|e| e.message.as_str()).collect()
    }

    pub fn codes(&self, field: &str) -> Vec<ErrorCode> {
        self.get(field).iter().map(|e| e.code).collect()
    }

    pub fn has(&self, field: &str, code: ErrorCode) -> bool {
        self.get(field).iter().any(|e| e.code == code)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FieldError])> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl fmt::Display for ErrorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, errors) in &self.errors {
            for error in errors {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{}: {}", field, error.message)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Inputs shared by every rule during one validation pass.
#[derive(Debug, Clone)]
pub struct ValidationContext<'a> {
    pub config: &'a EngineConfig,
    /// Reference date for year and date bounds.
    pub today: NaiveDate,
}

impl<'a> ValidationContext<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self {
            config,
            today: Utc::now().date_naive(),
        }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn current_year(&self) -> i32 {
        self.today.year()
    }

    /// Whether presence rules apply to this response.
    ///
    /// Mandatory attributes need an answer unless the value came from an
    /// external registry: a registry reporting no data is not a form error.
    pub fn requires_answer(&self, response: &Response) -> bool {
        response.mandatory && response.source.is_manual()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_groups_by_field_in_order() {
        let mut errors = ErrorSet::new();
        errors.add("documents", ErrorCode::Invalid, "a.exe is invalid");
        errors.add("documents", ErrorCode::Invalid, "b.exe is invalid");
        errors.add("text", ErrorCode::Required, "text is required");

        assert_eq!(errors.len(), 3);
        assert_eq!(
            errors.messages("documents"),
            vec!["a.exe is invalid", "b.exe is invalid"]
        );
        assert!(errors.has("text", ErrorCode::Required));
        assert!(!errors.has("text", ErrorCode::Invalid));
        assert!(errors.get("missing").is_empty());
    }

    #[test]
    fn display_joins_all_errors() {
        let mut errors = ErrorSet::new();
        errors.add("value", ErrorCode::Required, "value is required");
        errors.add("checked", ErrorCode::InvalidType, "checked must be a boolean");
        assert_eq!(
            errors.to_string(),
            "checked: checked must be a boolean; value: value is required"
        );
    }

    #[test]
    fn serializes_as_plain_mapping() {
        let mut errors = ErrorSet::new();
        errors.add("text", ErrorCode::TooLong, "too long");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"text": [{"code": "too_long", "message": "too long"}]})
        );
    }

    #[test]
    fn error_code_strings() {
        assert_eq!(ErrorCode::AdditionalProperties.as_str(), "additional_properties");
        assert_eq!(
            ErrorCode::DocumentNotAllowedUnlessChecked.to_string(),
            "document_not_allowed_unless_checked"
        );
    }
}
