//! # Repeatable Items
//!
//! Repeatable variants (team members, past deliveries, samples) hold an
//! open-ended list of sub-entries inside a single response:
//!
//! ```text
//! value = {
//!   "items": {
//!     "1700000000000": { "nom": "Martin", "prenoms": "Alice", "cv": "attached" },
//!     "1700000000042": { "nom": "Durand", "prenoms": "Paul" }
//!   }
//! }
//! ```
//!
//! ## Item Keys
//!
//! An [`ItemKey`] is a millisecond timestamp string chosen when the entry is
//! created. It is the item's identity and its sort key: [`items_ordered`]
//! sorts by the key's numeric value, oldest first. [`ItemKeyGenerator`] bumps
//! the key by one when the clock has not advanced, so two items created in the
//! same tick still get distinct, ordered keys.
//!
//! ## Form Convention
//!
//! Item fields arrive flattened as `<prefix>_<itemKey>_<fieldName>`, e.g.
//! `item_1700000000000_nom`. The special field `_destroy`
//! (`item_1700000000000__destroy`) removes the whole item.
//!
//! ## Item Schemas
//!
//! Each variant declares its fields in an [`ItemSchema`] table. Fields of type
//! [`ItemFieldType::Document`] are *specialized document fields*: the file is
//! attached to the parent response and the item only stores the
//! [`ATTACHED`] marker.

use std::cell::Cell;
use std::cmp::Ordering;
use std::fmt;

use chrono::Utc;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value::{self, ValueMap};

/// Key of the item mapping inside a repeatable response's value.
pub const ITEMS_KEY: &str = "items";

/// Marker stored in a specialized document field once a file is attached.
pub const ATTACHED: &str = "attached";

/// Field name that deletes an item when truthy.
pub const DESTROY: &str = "_destroy";

static EMPTY_ITEMS: Lazy<ValueMap> = Lazy::new(ValueMap::new);

/// Stable identifier of one repeatable item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(String);

impl ItemKey {
    /// Accepts non-empty all-digit strings.
    pub fn parse(s: &str) -> Option<Self> {
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            Some(ItemKey(s.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value of the key, used for ordering.
    pub fn ordinal(&self) -> u128 {
        self.0.parse().unwrap_or(u128::MAX)
    }
}

impl Ord for ItemKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordinal()
            .cmp(&other.ordinal())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for ItemKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issues time-derived item keys that never repeat within one generator.
#[derive(Debug, Default)]
pub struct ItemKeyGenerator {
    last: Cell<i64>,
}

impl ItemKeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_key(&self) -> ItemKey {
        self.next_at(Utc::now().timestamp_millis())
    }

    fn next_at(&self, now_millis: i64) -> ItemKey {
        let key = if now_millis > self.last.get() {
            now_millis
        } else {
            self.last.get() + 1
        };
        self.last.set(key);
        ItemKey(key.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemFieldType {
    /// Short single-line string.
    String,
    /// Free text.
    Text,
    Email,
    /// ISO-8601 `YYYY-MM-DD`.
    Date,
    /// Non-negative integer.
    Integer,
    /// Specialized document field, stored as an attachment on the parent.
    Document,
}

#[derive(Debug, Clone, Copy)]
pub struct ItemField {
    pub name: &'static str,
    pub field_type: ItemFieldType,
    pub required: bool,
}

impl ItemField {
    pub const fn new(name: &'static str, field_type: ItemFieldType) -> Self {
        Self {
            name,
            field_type,
            required: false,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn is_document(&self) -> bool {
        self.field_type == ItemFieldType::Document
    }
}

/// Declared fields of one repeatable variant's items.
#[derive(Debug, Clone, Copy)]
pub struct ItemSchema {
    /// Prefix of flattened form parameter names.
    pub prefix: &'static str,
    pub fields: &'static [ItemField],
}

impl ItemSchema {
    pub fn field(&self, name: &str) -> Option<&ItemField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn document_fields(&self) -> impl Iterator<Item = &ItemField> {
        self.fields.iter().filter(|f| f.is_document())
    }

    /// Split `<prefix>_<itemKey>_<fieldName>` into key and field name.
    ///
    /// Returns `None` for other parameters and for undeclared field names
    /// (except `_destroy`).
    pub fn parse_param<'a>(&self, name: &'a str) -> Option<(ItemKey, &'a str)> {
        let rest = name.strip_prefix(self.prefix)?.strip_prefix('_')?;
        let (key, field) = rest.split_once('_')?;
        let key = ItemKey::parse(key)?;
        if field == DESTROY || self.field(field).is_some() {
            Some((key, field))
        } else {
            None
        }
    }

    /// Whether every declared field of an item is blank.
    pub fn is_item_blank(&self, item: &ValueMap) -> bool {
        self.fields
            .iter()
            .all(|f| item.get(f.name).map_or(true, value::is_blank))
    }
}

/// The `value["items"]` mapping, or an empty one.
pub fn items(value: &ValueMap) -> &ValueMap {
    value
        .get(ITEMS_KEY)
        .and_then(Value::as_object)
        .unwrap_or(&EMPTY_ITEMS)
}

/// Items sorted by key, oldest first. Malformed keys and non-object
/// entries are skipped.
pub fn items_ordered(value: &ValueMap) -> Vec<(ItemKey, &ValueMap)> {
    let mut ordered: Vec<(ItemKey, &ValueMap)> = items(value)
        .iter()
        .filter_map(|(k, v)| Some((ItemKey::parse(k)?, v.as_object()?)))
        .collect();
    ordered.sort_by(|a, b| a.0.cmp(&b.0));
    ordered
}

/// Set one field of an item, creating the item (and the mapping) if needed.
///
/// `None` stores `null`.
pub fn set_item_field(value: &mut ValueMap, key: &ItemKey, field: &str, new: Option<Value>) {
    let items = value
        .entry(ITEMS_KEY)
        .or_insert_with(|| Value::Object(ValueMap::new()));
    if !items.is_object() {
        *items = Value::Object(ValueMap::new());
    }
    if let Value::Object(items) = items {
        let item = items
            .entry(key.as_str())
            .or_insert_with(|| Value::Object(ValueMap::new()));
        if !item.is_object() {
            *item = Value::Object(ValueMap::new());
        }
        if let Value::Object(item) = item {
            item.insert(field.to_string(), new.unwrap_or(Value::Null));
        }
    }
}

/// Remove an item. Returns true if it existed.
pub fn remove_item(value: &mut ValueMap, key: &ItemKey) -> bool {
    match value.get_mut(ITEMS_KEY) {
        Some(Value::Object(items)) => items.remove(key.as_str()).is_some(),
        _ => false,
    }
}

/// Remove every item whose declared fields are all blank.
///
/// Returns the keys of removed items.
pub fn prune_blank_items(schema: &ItemSchema, value: &mut ValueMap) -> Vec<ItemKey> {
    let Some(Value::Object(items)) = value.get_mut(ITEMS_KEY) else {
        return Vec::new();
    };
    let blank: Vec<String> = items
        .iter()
        .filter(|(_, item)| match item {
            Value::Object(fields) => schema.is_item_blank(fields),
            other => value::is_blank(other),
        })
        .map(|(k, _)| k.clone())
        .collect();
    for k in &blank {
        items.remove(k);
    }
    blank.iter().filter_map(|k| ItemKey::parse(k)).collect()
}
