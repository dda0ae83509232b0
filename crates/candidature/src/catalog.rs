//! Attribute catalog.
//!
//! The catalog is owned upstream (imported from the procurement definition);
//! the engine only consumes its entries. An entry names the attribute, picks
//! the variant that governs its responses, and says whether an answer is
//! mandatory. Entries with an `api_name` can be auto-filled from an external
//! registry.

use serde::{Deserialize, Serialize};

use crate::error::{CandidatureError, Result};
use crate::variants::VariantKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub key: String,
    pub variant: VariantKind,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub api_name: Option<String>,
}

impl CatalogEntry {
    /// Create an optional, manual-only entry.
    pub fn new(key: impl Into<String>, variant: VariantKind) -> Self {
        Self {
            key: key.into(),
            variant,
            mandatory: false,
            api_name: None,
        }
    }

    /// Set the mandatory flag.
    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// Name the registry field this attribute can be auto-filled from.
    pub fn with_api_name(mut self, api_name: impl Into<String>) -> Self {
        self.api_name = Some(api_name.into());
        self
    }
}

/// Lookup table over catalog entries, keyed by attribute key.
#[derive(Debug, Clone, Default)]
pub struct AttributeCatalog {
    entries: Vec<CatalogEntry>,
}

impl AttributeCatalog {
    /// Build a catalog. Keys must be unique.
    pub fn new(entries: Vec<CatalogEntry>) -> Result<Self> {
        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|e| e.key == entry.key) {
                return Err(CandidatureError::Registry(format!(
                    "duplicate catalog key '{}'",
                    entry.key
                )));
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    /// Entries that an external registry can fill.
    pub fn auto_fillable(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter().filter(|e| e.api_name.is_some())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
