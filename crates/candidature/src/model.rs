//! # Domain Model: Responses
//!
//! This module defines the persisted record of the engine: [`Response`], one
//! per (application, attribute) pair, plus its provenance ([`Source`]) and its
//! attachment links ([`AttachmentRef`]).
//!
//! ## One Record, Many Shapes
//!
//! Every response has the same fields. What differs between a phone number, a
//! yes/no question with justification, and a list of team members is the
//! *shape* of `value` and the rules applied to it, both selected by the
//! response's [`VariantKind`].
//!
//! ## Attachments
//!
//! Attachments are an ordered list of blob references. Each link carries a
//! string `metadata` mapping; repeatable variants use it to tag which item and
//! which field a file belongs to:
//!
//! ```text
//! { "field_type": "specialized", "item_key": "1700000000000", "field_name": "cv" }
//! ```
//!
//! Links without `field_type = specialized` are the response's general
//! documents.
//!
//! ## Provenance
//!
//! `source` records where the value came from. `manual_after_api_failure` is
//! sticky: once a registry lookup failed and the applicant answered by hand,
//! later registry data must not silently relabel the answer. Only
//! [`Response::reset_provenance`] clears it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::attachments::{Blob, BlobId};
use crate::catalog::CatalogEntry;
use crate::items::{self, ItemKey};
use crate::value::{self, ValueMap};
use crate::variants::VariantKind;

/// Metadata keys used to tag specialized document links.
pub const META_FIELD_TYPE: &str = "field_type";
pub const META_ITEM_KEY: &str = "item_key";
pub const META_FIELD_NAME: &str = "field_name";
pub const SPECIALIZED: &str = "specialized";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    #[default]
    Manual,
    Auto,
    ManualAfterApiFailure,
}

impl Source {
    /// Whether a person typed this answer.
    pub fn is_manual(self) -> bool {
        !matches!(self, Source::Auto)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Source::Manual => "manual",
            Source::Auto => "auto",
            Source::ManualAfterApiFailure => "manual_after_api_failure",
        }
    }
}

/// A link from a response to a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub blob: Blob,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl AttachmentRef {
    pub fn new(blob: Blob, metadata: BTreeMap<String, String>) -> Self {
        Self { blob, metadata }
    }

    pub fn is_specialized(&self) -> bool {
        self.metadata.get(META_FIELD_TYPE).map(String::as_str) == Some(SPECIALIZED)
    }

    /// Whether this link belongs to the given item (and field, if given).
    pub fn belongs_to(&self, item_key: &ItemKey, field_name: Option<&str>) -> bool {
        self.is_specialized()
            && self.metadata.get(META_ITEM_KEY).map(String::as_str) == Some(item_key.as_str())
            && field_name.map_or(true, |f| {
                self.metadata.get(META_FIELD_NAME).map(String::as_str) == Some(f)
            })
    }
}

/// Metadata tagging a file to one field of one repeatable item.
pub fn specialized_metadata(item_key: &ItemKey, field_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (META_FIELD_TYPE.to_string(), SPECIALIZED.to_string()),
        (META_ITEM_KEY.to_string(), item_key.as_str().to_string()),
        (META_FIELD_NAME.to_string(), field_name.to_string()),
    ])
}

/// A failed attachment attempt, reported on `documents` at validation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedUpload {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: Uuid,
    pub application_id: Uuid,
    /// Catalog key of the attribute this response answers.
    pub attribute_key: String,
    pub variant: VariantKind,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub value: ValueMap,
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Attachment failures from the latest assignment. Not persisted.
    #[serde(skip)]
    pub(crate) rejected_uploads: Vec<RejectedUpload>,
    /// Blob references taken during this unit of work, one per link it added.
    /// Not persisted.
    #[serde(skip)]
    pub(crate) held_blobs: Vec<BlobId>,
}

impl Response {
    /// Initialize a blank response for a catalog entry.
    ///
    /// Radio variants start on `"no"`.
    pub fn new(application_id: Uuid, entry: &CatalogEntry) -> Self {
        let now = Utc::now();
        let mut value = ValueMap::new();
        if entry.variant.is_radio() {
            value.insert("radio_choice".to_string(), Value::String("no".to_string()));
        }
        Self {
            id: Uuid::new_v4(),
            application_id,
            attribute_key: entry.key.clone(),
            variant: entry.variant,
            mandatory: entry.mandatory,
            value,
            source: Source::Manual,
            hidden: false,
            attachments: Vec::new(),
            created_at: now,
            updated_at: now,
            rejected_uploads: Vec::new(),
            held_blobs: Vec::new(),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Whether the response carries no answer at all.
    pub fn is_blank(&self) -> bool {
        value::is_map_blank(&self.value) && self.attachments.is_empty()
    }

    pub fn rejected_uploads(&self) -> &[RejectedUpload] {
        &self.rejected_uploads
    }

    // --- Provenance ---

    /// Move provenance to `source`.
    ///
    /// Returns false, leaving provenance untouched, when the response is
    /// `manual_after_api_failure` and `source` would relabel it.
    pub fn apply_source(&mut self, source: Source) -> bool {
        if self.source == source {
            return true;
        }
        if self.source == Source::ManualAfterApiFailure {
            warn!(
                response = %self.id,
                attribute = %self.attribute_key,
                refused = source.as_str(),
                "Provenance is manual_after_api_failure; refusing overwrite"
            );
            return false;
        }
        info!(
            response = %self.id,
            attribute = %self.attribute_key,
            from = self.source.as_str(),
            to = source.as_str(),
            "Provenance changed"
        );
        self.source = source;
        true
    }

    /// Explicitly clear a sticky `manual_after_api_failure` provenance.
    pub fn reset_provenance(&mut self) {
        self.source = Source::Manual;
    }

    // --- Attachments ---

    /// Link a blob. Linking the same blob into the same slot twice is a no-op.
    ///
    /// Returns true if a new link was added.
    pub fn attach(&mut self, blob: Blob, metadata: BTreeMap<String, String>) -> bool {
        if self
            .attachments
            .iter()
            .any(|a| a.blob.id == blob.id && a.metadata == metadata)
        {
            return false;
        }
        self.attachments.push(AttachmentRef::new(blob, metadata));
        true
    }

    /// Remove every link matching `pred`, returning the removed links.
    pub fn detach_where<F>(&mut self, pred: F) -> Vec<AttachmentRef>
    where
        F: Fn(&AttachmentRef) -> bool,
    {
        let (removed, kept): (Vec<_>, Vec<_>) =
            self.attachments.drain(..).partition(|a| pred(a));
        self.attachments = kept;
        removed
    }

    /// Links that are not tagged to a repeatable item.
    pub fn general_attachments(&self) -> impl Iterator<Item = &AttachmentRef> {
        self.attachments.iter().filter(|a| !a.is_specialized())
    }

    /// Documents of one field of one repeatable item.
    pub fn item_documents(&self, item_key: &ItemKey, field_name: &str) -> Vec<&AttachmentRef> {
        self.attachments
            .iter()
            .filter(|a| a.belongs_to(item_key, Some(field_name)))
            .collect()
    }

    // --- Repeatable items ---

    /// The live `value["items"]` mapping (empty if no item was ever set).
    pub fn items(&self) -> &ValueMap {
        items::items(&self.value)
    }

    /// Items sorted by the numeric value of their key, oldest first.
    pub fn items_ordered(&self) -> Vec<(ItemKey, &ValueMap)> {
        items::items_ordered(&self.value)
    }
}
