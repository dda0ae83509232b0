//! # Repeatable Collection Rules
//!
//! [`RepeatableRule`] folds flattened `<prefix>_<itemKey>_<field>` parameters
//! into `value["items"]` and prunes abandoned items; [`ItemsRule`] checks each
//! surviving item against the variant's [`ItemSchema`].
//!
//! ## Assign
//!
//! Parameters are grouped by item key and applied oldest key first:
//!
//! - a truthy `_destroy` deletes the item and every attachment tagged with its
//!   key; the group's other fields are ignored
//! - a specialized document field given a file (upload or signed reference)
//!   attaches it to the parent response tagged with `{specialized, key, field}`
//!   and stores the [`ATTACHED`] marker in the item
//! - a specialized document field given a blank scalar clears the marker and
//!   detaches the field's files; any other scalar is stored as-is
//! - every other declared field is set to its presence-normalized value
//!
//! ## Prune
//!
//! Normalization removes items whose declared fields are all blank, and
//! detaches their files. Abandoned entries never persist and never produce
//! "required" noise.
//!
//! ## Validate
//!
//! Errors are keyed `items` and address items by 1-based position in key
//! order, e.g. `item 2: nom is required`.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use super::files::attach_input;
use super::text::is_valid_email;
use super::{AssignContext, FieldRule, Stage};
use crate::input::{FormInput, InputValue};
use crate::items::{self, ItemFieldType, ItemKey, ItemSchema, ATTACHED, DESTROY, ITEMS_KEY};
use crate::model::{specialized_metadata, Response};
use crate::validation::{ErrorCode, ErrorSet, ValidationContext};
use crate::value;

#[derive(Debug, Clone, Copy)]
pub struct RepeatableRule {
    pub schema: ItemSchema,
}

impl RepeatableRule {
    pub fn new(schema: ItemSchema) -> Self {
        Self { schema }
    }

    fn destroy(&self, response: &mut Response, key: &ItemKey) {
        let existed = items::remove_item(&mut response.value, key);
        let detached = response.detach_where(|a| a.belongs_to(key, None));
        debug!(
            response = %response.id,
            item = %key,
            existed,
            documents = detached.len(),
            "Destroyed item"
        );
    }

    fn assign_document(
        &self,
        response: &mut Response,
        key: &ItemKey,
        field: &str,
        raw: &InputValue,
        cx: &AssignContext<'_>,
    ) {
        if raw.is_file_like() {
            let outcome = attach_input(response, raw, &specialized_metadata(key, field), cx);
            if outcome.linked > 0 {
                items::set_item_field(
                    &mut response.value,
                    key,
                    field,
                    Some(Value::String(ATTACHED.to_string())),
                );
            }
            return;
        }
        match raw.as_scalar().and_then(value::presence) {
            Some(v) => items::set_item_field(&mut response.value, key, field, Some(v)),
            None => {
                items::set_item_field(&mut response.value, key, field, None);
                response.detach_where(|a| a.belongs_to(key, Some(field)));
            }
        }
    }
}

impl FieldRule for RepeatableRule {
    fn name(&self) -> &'static str {
        "repeatable"
    }

    fn assign(&self, response: &mut Response, input: &FormInput, cx: &AssignContext<'_>) {
        let mut groups: BTreeMap<ItemKey, Vec<(&str, &InputValue)>> = BTreeMap::new();
        for (name, raw) in input.iter() {
            if let Some((key, field)) = self.schema.parse_param(name) {
                groups.entry(key).or_default().push((field, raw));
            }
        }

        for (key, fields) in groups {
            let destroyed = fields.iter().any(|(field, raw)| {
                *field == DESTROY && raw.as_scalar().is_some_and(value::is_truthy)
            });
            if destroyed {
                self.destroy(response, &key);
                continue;
            }

            for (field, raw) in fields {
                let Some(declared) = self.schema.field(field) else {
                    continue;
                };
                if declared.is_document() {
                    self.assign_document(response, &key, field, raw, cx);
                } else if let Some(scalar) = raw.as_scalar() {
                    items::set_item_field(&mut response.value, &key, field, value::presence(scalar));
                }
            }
        }
    }

    fn normalize(&self, response: &mut Response) {
        let removed = items::prune_blank_items(&self.schema, &mut response.value);
        for key in &removed {
            response.detach_where(|a| a.belongs_to(key, None));
        }
        if !removed.is_empty() {
            debug!(response = %response.id, pruned = removed.len(), "Pruned blank items");
        }
        if matches!(response.value.get(ITEMS_KEY), Some(Value::Object(m)) if m.is_empty()) {
            response.value.remove(ITEMS_KEY);
        }
    }

    fn validate(&self, _response: &Response, _cx: &ValidationContext<'_>, _errors: &mut ErrorSet) {}
}

/// Per-item validation against the item schema.
#[derive(Debug, Clone, Copy)]
pub struct ItemsRule {
    pub schema: ItemSchema,
    pub max_text_length: usize,
}

impl ItemsRule {
    pub fn new(schema: ItemSchema, max_text_length: usize) -> Self {
        Self {
            schema,
            max_text_length,
        }
    }

    fn check_field(
        &self,
        position: usize,
        name: &str,
        field_type: ItemFieldType,
        raw: &Value,
        errors: &mut ErrorSet,
    ) {
        let prefix = format!("item {}: {}", position, name);
        match field_type {
            ItemFieldType::String | ItemFieldType::Text => match raw.as_str() {
                Some(s) if s.chars().count() > self.max_text_length => errors.add(
                    ITEMS_KEY,
                    ErrorCode::TooLong,
                    format!("{} is too long (maximum is {} characters)", prefix, self.max_text_length),
                ),
                Some(_) => {}
                None => errors.add(
                    ITEMS_KEY,
                    ErrorCode::InvalidType,
                    format!("{} must be a string", prefix),
                ),
            },
            ItemFieldType::Email => {
                if !raw.as_str().is_some_and(|s| is_valid_email(s.trim())) {
                    errors.add(
                        ITEMS_KEY,
                        ErrorCode::Format,
                        format!("{} is not a valid email address", prefix),
                    );
                }
            }
            ItemFieldType::Date => {
                let valid = raw
                    .as_str()
                    .is_some_and(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").is_ok());
                if !valid {
                    errors.add(
                        ITEMS_KEY,
                        ErrorCode::InvalidDate,
                        format!("{} is not a valid date", prefix),
                    );
                }
            }
            ItemFieldType::Integer => {
                if value::as_non_negative_integer(raw).is_none() {
                    errors.add(
                        ITEMS_KEY,
                        ErrorCode::NotAPositiveInteger,
                        format!("{} must be a positive integer", prefix),
                    );
                }
            }
            // Presence of a document field is checked against the attachments.
            ItemFieldType::Document => {}
        }
    }
}

impl FieldRule for ItemsRule {
    fn name(&self) -> &'static str {
        "items"
    }

    fn stage(&self) -> Stage {
        Stage::Semantic
    }

    fn validate(&self, response: &Response, _cx: &ValidationContext<'_>, errors: &mut ErrorSet) {
        for (key, item) in response.items() {
            if ItemKey::parse(key).is_none() || !item.is_object() {
                errors.add(
                    ITEMS_KEY,
                    ErrorCode::Invalid,
                    format!("item {} is malformed", key),
                );
            }
        }

        for (index, (key, item)) in response.items_ordered().into_iter().enumerate() {
            let position = index + 1;
            for field in self.schema.fields {
                if field.is_document() {
                    if field.required && response.item_documents(&key, field.name).is_empty() {
                        errors.add(
                            ITEMS_KEY,
                            ErrorCode::DocumentRequired,
                            format!("item {}: {} is required", position, field.name),
                        );
                    }
                    continue;
                }
                match item.get(field.name).and_then(value::presence) {
                    Some(raw) => self.check_field(position, field.name, field.field_type, &raw, errors),
                    None if field.required => errors.add(
                        ITEMS_KEY,
                        ErrorCode::Required,
                        format!("item {}: {} is required", position, field.name),
                    ),
                    None => {}
                }
            }
        }
    }
}
