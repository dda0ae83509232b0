//! # Cross-Field Rules
//!
//! Consistency checks that look at more than one part of a response. They run
//! last ([`Stage::CrossField`]), after each field has been checked on its own.
//!
//! - [`RadioConditionalRule`]: a radio choice reveals or hides the `text`
//!   field and the general documents. Hidden fields are stripped during
//!   normalization; any that survive are reported.
//! - [`DocumentsOnlyWhenChecked`]: documents are only allowed on a checked box.
//! - [`MinimumDocuments`]: at least N general documents.
//! - [`TextOrDocument`]: either a text answer or a document.
//!
//! Presence checks apply only when the response requires an answer (see
//! [`ValidationContext::requires_answer`]).

use tracing::debug;

use super::checkbox::is_checked;
use super::files::DOCUMENTS_KEY;
use super::radio::{RadioChoice, RADIO_KEY};
use super::text::TEXT_KEY;
use super::{FieldRule, Stage};
use crate::model::Response;
use crate::validation::{ErrorCode, ErrorSet, ValidationContext};
use crate::value;

/// Radio-driven visibility of `text` and the general documents.
#[derive(Debug, Clone, Copy)]
pub struct RadioConditionalRule {
    /// Choice that reveals the conditional fields.
    pub reveal_on: RadioChoice,
    /// Whether at least one document is required once revealed.
    pub document_required: bool,
}

impl RadioConditionalRule {
    pub const fn reveal_on(choice: RadioChoice) -> Self {
        Self {
            reveal_on: choice,
            document_required: false,
        }
    }

    pub const fn with_required_document(mut self) -> Self {
        self.document_required = true;
        self
    }

    /// Whether the response's choice hides the conditional fields.
    ///
    /// Unrecognized choices hide nothing; the radio rule reports them.
    fn hides(&self, response: &Response) -> bool {
        RadioChoice::of(response).is_some_and(|choice| choice != self.reveal_on)
    }
}

impl FieldRule for RadioConditionalRule {
    fn name(&self) -> &'static str {
        "radio_conditional"
    }

    fn stage(&self) -> Stage {
        Stage::CrossField
    }

    fn normalize(&self, response: &mut Response) {
        if !self.hides(response) {
            return;
        }
        let had_text = response.value.remove(TEXT_KEY).is_some();
        let detached = response.detach_where(|a| !a.is_specialized());
        if had_text || !detached.is_empty() {
            debug!(
                response = %response.id,
                documents = detached.len(),
                "Stripped fields hidden by radio choice"
            );
        }
    }

    fn validate(&self, response: &Response, cx: &ValidationContext<'_>, errors: &mut ErrorSet) {
        if self.hides(response) {
            let choice = response
                .value
                .get(RADIO_KEY)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .trim()
                .to_lowercase();
            if value::is_present(&response.value, TEXT_KEY) {
                errors.add(
                    TEXT_KEY,
                    ErrorCode::NotAllowedForChoice,
                    format!("text is not allowed when the answer is {}", choice),
                );
            }
            if response.general_attachments().next().is_some() {
                errors.add(
                    DOCUMENTS_KEY,
                    ErrorCode::NotAllowedForChoice,
                    format!("documents are not allowed when the answer is {}", choice),
                );
            }
            return;
        }

        if self.document_required
            && RadioChoice::of(response) == Some(self.reveal_on)
            && cx.requires_answer(response)
            && response.general_attachments().next().is_none()
        {
            errors.add(
                DOCUMENTS_KEY,
                ErrorCode::DocumentRequired,
                format!(
                    "a document is required when the answer is {}",
                    self.reveal_on.as_str()
                ),
            );
        }
    }
}

/// Documents are only allowed once the box is checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentsOnlyWhenChecked;

impl FieldRule for DocumentsOnlyWhenChecked {
    fn name(&self) -> &'static str {
        "documents_only_when_checked"
    }

    fn stage(&self) -> Stage {
        Stage::CrossField
    }

    fn validate(&self, response: &Response, _cx: &ValidationContext<'_>, errors: &mut ErrorSet) {
        if !is_checked(&response.value) && response.general_attachments().next().is_some() {
            errors.add(
                DOCUMENTS_KEY,
                ErrorCode::DocumentNotAllowedUnlessChecked,
                "documents are only allowed when the box is checked",
            );
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MinimumDocuments {
    pub min: usize,
}

impl FieldRule for MinimumDocuments {
    fn name(&self) -> &'static str {
        "minimum_documents"
    }

    fn stage(&self) -> Stage {
        Stage::CrossField
    }

    fn validate(&self, response: &Response, cx: &ValidationContext<'_>, errors: &mut ErrorSet) {
        if !cx.requires_answer(response) {
            return;
        }
        let count = response.general_attachments().count();
        if count < self.min {
            let message = if self.min == 1 {
                "at least one document is required".to_string()
            } else {
                format!("at least {} documents are required", self.min)
            };
            errors.add(DOCUMENTS_KEY, ErrorCode::Required, message);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TextOrDocument;

impl FieldRule for TextOrDocument {
    fn name(&self) -> &'static str {
        "text_or_document"
    }

    fn stage(&self) -> Stage {
        Stage::CrossField
    }

    fn validate(&self, response: &Response, cx: &ValidationContext<'_>, errors: &mut ErrorSet) {
        if !cx.requires_answer(response) {
            return;
        }
        if !value::is_present(&response.value, TEXT_KEY)
            && response.general_attachments().next().is_none()
        {
            errors.add("value", ErrorCode::Required, "either a text or a document is required");
        }
    }
}
