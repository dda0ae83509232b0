use std::cell::RefCell;
use std::collections::HashMap;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use super::{checksum, AttachmentStore, Blob, BlobId, ResolveError, Stored};
use crate::error::{CandidatureError, Result};
use crate::input::FileUpload;

type HmacSha256 = Hmac<Sha256>;

/// Separator between the blob id and its signature in a signed reference.
const SIGNATURE_SEPARATOR: &str = "--";

struct StoredBlob {
    blob: Blob,
    data: Vec<u8>,
    refs: usize,
}

/// In-memory attachment store.
///
/// Uses `RefCell` for interior mutability since a store is driven by a single
/// unit of work at a time. Signed references are `<blob id>--<hex hmac>`.
pub struct MemBlobStore {
    mac: HmacSha256,
    blobs: RefCell<HashMap<BlobId, StoredBlob>>,
    simulate_put_error: RefCell<bool>,
}

impl MemBlobStore {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self> {
        let mac = <HmacSha256 as Mac>::new_from_slice(secret.as_ref())
            .map_err(|e| CandidatureError::Config(format!("invalid signing secret: {}", e)))?;
        Ok(Self {
            mac,
            blobs: RefCell::new(HashMap::new()),
            simulate_put_error: RefCell::new(false),
        })
    }

    pub fn contains(&self, id: &BlobId) -> bool {
        self.blobs.borrow().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.blobs.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.borrow().is_empty()
    }

    /// Outstanding references on a blob, zero if it is not stored.
    pub fn refs(&self, id: &BlobId) -> usize {
        self.blobs.borrow().get(id).map_or(0, |stored| stored.refs)
    }

    /// Enable put error simulation for testing error handling.
    pub fn set_simulate_put_error(&self, simulate: bool) {
        *self.simulate_put_error.borrow_mut() = simulate;
    }

    /// Test helper to flip stored bytes so the integrity check fails.
    /// Returns true if the blob existed.
    pub fn corrupt(&self, id: &BlobId) -> bool {
        let mut blobs = self.blobs.borrow_mut();
        if let Some(stored) = blobs.get_mut(id) {
            stored.data.push(0xFF);
            true
        } else {
            false
        }
    }

    fn verify(&self, id: &str, signature: &str) -> bool {
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        let mut mac = self.mac.clone();
        mac.update(id.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}

impl AttachmentStore for MemBlobStore {
    fn put(&self, upload: &FileUpload) -> Result<Stored> {
        if *self.simulate_put_error.borrow() {
            return Err(CandidatureError::Attachment(
                "Simulated put error".to_string(),
            ));
        }

        let id = BlobId::for_content(&upload.data);
        let mut blobs = self.blobs.borrow_mut();
        if let Some(existing) = blobs.get_mut(&id) {
            existing.refs += 1;
            debug!(blob = %id, refs = existing.refs, "Blob already stored");
            return Ok(Stored {
                blob: existing.blob.clone(),
                created: false,
            });
        }

        let blob = Blob {
            id: id.clone(),
            filename: upload.filename.clone(),
            content_type: upload.content_type.clone(),
            byte_size: upload.data.len() as u64,
            checksum: checksum(&upload.data),
        };
        blobs.insert(
            id,
            StoredBlob {
                blob: blob.clone(),
                data: upload.data.clone(),
                refs: 1,
            },
        );
        debug!(blob = %blob.id, size = blob.byte_size, "Stored blob");
        Ok(Stored {
            blob,
            created: true,
        })
    }

    fn resolve(&self, signed_ref: &str) -> std::result::Result<Blob, ResolveError> {
        let (id, signature) = signed_ref
            .rsplit_once(SIGNATURE_SEPARATOR)
            .ok_or(ResolveError::InvalidSignature)?;
        if !self.verify(id, signature) {
            return Err(ResolveError::InvalidSignature);
        }

        let id = BlobId::from(id);
        let blobs = self.blobs.borrow();
        let stored = blobs
            .get(&id)
            .ok_or_else(|| ResolveError::NotFound(id.clone()))?;
        if checksum(&stored.data) != stored.blob.checksum {
            return Err(ResolveError::Integrity(id));
        }
        Ok(stored.blob.clone())
    }

    fn open(&self, id: &BlobId) -> Result<Vec<u8>> {
        self.blobs
            .borrow()
            .get(id)
            .map(|stored| stored.data.clone())
            .ok_or_else(|| CandidatureError::Attachment(format!("blob {} not found", id)))
    }

    fn sign(&self, id: &BlobId) -> String {
        let mut mac = self.mac.clone();
        mac.update(id.as_str().as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        format!("{}{}{}", id, SIGNATURE_SEPARATOR, signature)
    }

    fn retain(&self, id: &BlobId) -> Result<()> {
        let mut blobs = self.blobs.borrow_mut();
        let stored = blobs
            .get_mut(id)
            .ok_or_else(|| CandidatureError::Attachment(format!("blob {} not found", id)))?;
        stored.refs += 1;
        Ok(())
    }

    fn release(&self, id: &BlobId) -> Result<()> {
        let mut blobs = self.blobs.borrow_mut();
        let Some(stored) = blobs.get_mut(id) else {
            return Ok(());
        };
        stored.refs = stored.refs.saturating_sub(1);
        if stored.refs == 0 {
            blobs.remove(id);
            debug!(blob = %id, "Removed unreferenced blob");
        }
        Ok(())
    }
}
