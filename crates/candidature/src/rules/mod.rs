//! # Field Rules
//!
//! A rule is an independently testable bundle of normalization and validation
//! behavior. Variants are compositions of rules (see [`crate::variants`]); the
//! engine never branches on variant kind itself.
//!
//! ## Lifecycle
//!
//! For one unit of work, the engine drives every rule of the variant through:
//!
//! 1. [`FieldRule::assign`]: fold the recognized form fields into the value
//!    and the attachment list. Never fails; unrecognized keys are ignored.
//! 2. [`FieldRule::normalize`]: coerce and clean stored data into canonical
//!    shapes (boolean casts, lower-cased choices, pruned items).
//! 3. [`FieldRule::validate`]: report problems into the [`ErrorSet`]. Rules
//!    run grouped by [`Stage`]: shape, then semantic, then cross-field.
//!
//! ## Rules
//!
//! | Rule | Module | Concern |
//! |------|--------|---------|
//! | [`SchemaRule`] | [`schema`] | Allowed / required keys |
//! | [`TextRule`] | [`text`] | Single string, length, format |
//! | [`CheckboxRule`] | [`checkbox`] | Boolean `checked` |
//! | [`RadioRule`] | [`radio`] | `yes` / `no` choice |
//! | [`FileRule`] | [`files`] | Attachment whitelist, size, filename |
//! | [`RepeatableRule`], [`ItemsRule`] | [`repeatable`] | Repeatable items |
//! | [`YearlyRule`] | [`yearly`] | Three fixed year slots |
//! | conditional rules | [`conditional`] | Cross-field consistency |

use crate::attachments::AttachmentStore;
use crate::input::FormInput;
use crate::model::Response;
use crate::validation::{ErrorSet, ValidationContext};

pub mod checkbox;
pub mod conditional;
pub mod files;
pub mod radio;
pub mod repeatable;
pub mod schema;
pub mod text;
pub mod yearly;

pub use checkbox::CheckboxRule;
pub use conditional::{
    DocumentsOnlyWhenChecked, MinimumDocuments, RadioConditionalRule, TextOrDocument,
};
pub use files::{FileLimits, FileRule};
pub use radio::{RadioChoice, RadioRule};
pub use repeatable::{ItemsRule, RepeatableRule};
pub use schema::SchemaRule;
pub use text::{TextFormat, TextRule};
pub use yearly::{SlotField, SlotFieldKind, YearlyRule, YearlyTable};

/// Validation ordering group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Structural checks on the raw shape.
    Shape,
    /// Domain rules on present values.
    Semantic,
    /// Consistency between fields.
    CrossField,
}

/// Collaborators available while folding input.
pub struct AssignContext<'a> {
    pub attachments: &'a dyn AttachmentStore,
}

impl<'a> AssignContext<'a> {
    pub fn new(attachments: &'a dyn AttachmentStore) -> Self {
        Self { attachments }
    }
}

pub trait FieldRule {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    fn stage(&self) -> Stage {
        Stage::Semantic
    }

    fn assign(&self, _response: &mut Response, _input: &FormInput, _cx: &AssignContext<'_>) {}

    fn normalize(&self, _response: &mut Response) {}

    fn validate(&self, response: &Response, cx: &ValidationContext<'_>, errors: &mut ErrorSet);
}
