//! # Configuration
//!
//! Engine limits are managed by [`confique`], which handles layered loading
//! from a TOML file, environment variables, and compiled defaults.
//!
//! ## Resolution Order
//!
//! 1. **Environment variables**: `CANDIDATURE_MAX_TEXT_LENGTH`, `CANDIDATURE_MAX_FILE_SIZE`, etc.
//! 2. **Config file**: the TOML file handed to [`EngineConfig::load`].
//! 3. **Compiled defaults**: Built-in fallbacks via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `max_text_length` | `10000` | Maximum characters in a text answer |
//! | `max_phone_length` | `20` | Maximum characters in a phone answer |
//! | `max_file_size` | `104857600` | Largest accepted attachment, in bytes (100 MB) |
//! | `max_filename_length` | `255` | Longest accepted attachment filename, in characters |
//! | `allowed_content_types` | PDF, images, Word/Excel/OpenDocument | Attachment whitelist |
//! | `min_year` | `2000` | Earliest year accepted in yearly workforce data |

use std::path::Path;

use confique::Config;
use serde::{Deserialize, Serialize};

use crate::error::{CandidatureError, Result};

fn default_content_types() -> Vec<String> {
    [
        "application/pdf",
        "image/png",
        "image/jpeg",
        "image/gif",
        "image/webp",
        "application/msword",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "application/vnd.ms-excel",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "application/vnd.oasis.opendocument.text",
        "application/vnd.oasis.opendocument.spreadsheet",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Limits applied by the validation rules.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum number of characters in a text answer.
    #[config(default = 10000, env = "CANDIDATURE_MAX_TEXT_LENGTH")]
    pub max_text_length: usize,

    /// Maximum number of characters in a phone answer.
    #[config(default = 20, env = "CANDIDATURE_MAX_PHONE_LENGTH")]
    pub max_phone_length: usize,

    /// Largest accepted attachment, in bytes (inclusive).
    #[config(default = 104857600, env = "CANDIDATURE_MAX_FILE_SIZE")]
    pub max_file_size: u64,

    /// Longest accepted attachment filename, in characters.
    #[config(default = 255, env = "CANDIDATURE_MAX_FILENAME_LENGTH")]
    pub max_filename_length: usize,

    /// Content types accepted for attachments.
    /// When absent, defaults to PDF, common images, and office formats.
    pub allowed_content_types: Option<Vec<String>>,

    /// Earliest year accepted in yearly workforce data.
    #[config(default = 2000, env = "CANDIDATURE_MIN_YEAR")]
    pub min_year: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_text_length: 10_000,
            max_phone_length: 20,
            max_file_size: 100 * 1024 * 1024,
            max_filename_length: 255,
            allowed_content_types: None,
            min_year: 2000,
        }
    }
}

impl EngineConfig {
    /// Load from environment variables, then `path`, then compiled defaults.
    ///
    /// A missing file is not an error; the other layers still apply.
    pub fn load(path: &Path) -> Result<Self> {
        EngineConfig::builder()
            .env()
            .file(path)
            .load()
            .map_err(|e| CandidatureError::Config(e.to_string()))
    }

    /// Get the content type whitelist, using defaults if not configured.
    pub fn allowed_content_types(&self) -> Vec<String> {
        self.allowed_content_types
            .clone()
            .unwrap_or_else(default_content_types)
    }
}
