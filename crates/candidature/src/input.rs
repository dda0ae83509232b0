//! Raw input handed to the engine.
//!
//! Two shapes arrive from outside:
//!
//! - **Form input**: a flat `key → value` mapping from a submitted form. Keys
//!   are either plain (`text`, `checked`, `radio_choice`, `documents`) or follow
//!   a nested-field convention (`year_1_turnover`, `item_<itemKey>_<field>`).
//! - **Extractions**: a scalar or mapping produced by an external registry
//!   lookup, applied through [`crate::commands::autofill`].

use std::collections::BTreeMap;

use serde_json::Value;

/// A freshly uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl FileUpload {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data,
        }
    }
}

/// One submitted form value.
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    /// Any JSON-like scalar or nested value.
    Scalar(Value),
    /// A file payload uploaded with the form.
    Upload(FileUpload),
    /// A signed reference to a blob already in the attachment store.
    SignedRef(String),
    /// Several values under one key (multi-file inputs, hidden + checkbox pairs).
    Many(Vec<InputValue>),
}

impl InputValue {
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            InputValue::Scalar(v) => Some(v),
            // Browsers send a hidden "0" before the checkbox itself; the last value wins.
            InputValue::Many(values) => values.iter().rev().find_map(InputValue::as_scalar),
            _ => None,
        }
    }

    /// Whether this value carries a file (directly or by reference).
    pub fn is_file_like(&self) -> bool {
        match self {
            InputValue::Upload(_) | InputValue::SignedRef(_) => true,
            InputValue::Many(values) => values.iter().any(InputValue::is_file_like),
            InputValue::Scalar(_) => false,
        }
    }
}

impl From<&str> for InputValue {
    fn from(s: &str) -> Self {
        InputValue::Scalar(Value::String(s.to_string()))
    }
}

impl From<String> for InputValue {
    fn from(s: String) -> Self {
        InputValue::Scalar(Value::String(s))
    }
}

impl From<Value> for InputValue {
    fn from(v: Value) -> Self {
        InputValue::Scalar(v)
    }
}

impl From<FileUpload> for InputValue {
    fn from(f: FileUpload) -> Self {
        InputValue::Upload(f)
    }
}

/// A flat mapping of submitted form fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormInput {
    fields: BTreeMap<String, InputValue>,
}

impl FormInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<InputValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<InputValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&InputValue> {
        self.fields.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InputValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<InputValue>> FromIterator<(K, V)> for FormInput {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut input = FormInput::new();
        for (k, v) in iter {
            input.insert(k, v);
        }
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn last_scalar_wins_in_many() {
        let value = InputValue::Many(vec!["0".into(), "1".into()]);
        assert_eq!(value.as_scalar(), Some(&json!("1")));
    }

    #[test]
    fn uploads_are_file_like() {
        let upload = FileUpload::new("a.pdf", "application/pdf", vec![1]);
        assert!(InputValue::from(upload.clone()).is_file_like());
        assert!(InputValue::SignedRef("x--y".into()).is_file_like());
        assert!(InputValue::Many(vec!["".into(), upload.into()]).is_file_like());
        assert!(!InputValue::from("attached").is_file_like());
    }

    #[test]
    fn form_input_collects_pairs() {
        let input: FormInput = [("text", "hello"), ("other", "x")].into_iter().collect();
        assert_eq!(input.get("text"), Some(&InputValue::from("hello")));
        assert_eq!(input.iter().count(), 2);
    }
}
