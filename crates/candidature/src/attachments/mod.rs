//! # Attachment Store
//!
//! Blob storage is a collaborator: the engine only relies on the
//! [`AttachmentStore`] interface. Blobs are content-addressed (the id is the
//! SHA-256 of the bytes), and previously stored blobs can be referenced from a
//! form through a **signed reference** instead of being re-uploaded (the
//! "direct upload" path).
//!
//! ## Sharing
//!
//! Identical bytes uploaded by different responses share one blob, so a blob
//! is reference counted: [`AttachmentStore::put`] and
//! [`AttachmentStore::retain`] take a reference, [`AttachmentStore::release`]
//! drops one, and the blob is removed with its last reference. A [`Blob`]
//! held by a link describes that link's upload (its filename and content
//! type), which may differ from the descriptor the bytes were first stored
//! under.
//!
//! ## Resolution Failures
//!
//! [`AttachmentStore::resolve`] reports failures as [`ResolveError`]. Rules
//! never propagate them; they are logged and turned into a `documents` field
//! error during validation.
//!
//! ## Implementations
//!
//! - [`memory::MemBlobStore`]: in-process store with HMAC-SHA256 signed references.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::error::Result;
use crate::input::FileUpload;

pub mod memory;

/// Content-derived blob identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobId(String);

impl BlobId {
    /// Compute the id for a byte payload.
    pub fn for_content(data: &[u8]) -> Self {
        BlobId(checksum(data))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlobId {
    fn from(s: &str) -> Self {
        BlobId(s.to_string())
    }
}

/// Hex SHA-256 of a payload.
pub fn checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Descriptor of a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub id: BlobId,
    pub filename: String,
    pub content_type: String,
    pub byte_size: u64,
    pub checksum: String,
}

/// Result of [`AttachmentStore::put`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stored {
    pub blob: Blob,
    /// False when identical content was already stored.
    pub created: bool,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("signed reference is malformed or its signature does not match")]
    InvalidSignature,

    #[error("blob {0} not found")]
    NotFound(BlobId),

    #[error("blob {0} failed its integrity check")]
    Integrity(BlobId),
}

/// Abstract interface for blob storage.
///
/// Methods take `&self`; implementations handle their own interior
/// mutability, as the store is shared by every rule in a pass.
pub trait AttachmentStore {
    /// Store an uploaded file and take a reference on its blob.
    fn put(&self, upload: &FileUpload) -> Result<Stored>;

    /// Resolve a signed reference to a stored blob.
    fn resolve(&self, signed_ref: &str) -> std::result::Result<Blob, ResolveError>;

    /// Read a blob's bytes.
    fn open(&self, id: &BlobId) -> Result<Vec<u8>>;

    /// Issue a signed reference for a stored blob.
    fn sign(&self, id: &BlobId) -> String;

    /// Take another reference on a stored blob.
    fn retain(&self, id: &BlobId) -> Result<()>;

    /// Drop one reference. The blob is removed once no reference remains.
    fn release(&self, id: &BlobId) -> Result<()>;
}
