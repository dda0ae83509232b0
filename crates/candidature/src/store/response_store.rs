use super::backend::StorageBackend;
use super::ResponseStore;
use crate::error::{CandidatureError, Result};
use crate::model::{AttachmentRef, Response};
use tracing::debug;
use uuid::Uuid;

pub struct ResponseRepo<B: StorageBackend> {
    /// The underlying storage backend.
    /// Exposed as pub(crate) for testing and internal access only.
    pub(crate) backend: B,
}

impl<B: StorageBackend> ResponseRepo<B> {
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

/// Drop repeated (blob, metadata) links, keeping the first occurrence.
///
/// Returns the number of links removed.
fn dedup_links(links: &mut Vec<AttachmentRef>) -> usize {
    let before = links.len();
    let mut kept: Vec<AttachmentRef> = Vec::with_capacity(before);
    for link in links.drain(..) {
        if !kept
            .iter()
            .any(|k| k.blob.id == link.blob.id && k.metadata == link.metadata)
        {
            kept.push(link);
        }
    }
    *links = kept;
    before - links.len()
}

impl<B: StorageBackend> ResponseStore for ResponseRepo<B> {
    fn save(&mut self, response: &Response) -> Result<()> {
        let mut index = self.backend.load_responses()?;

        // One response per (application, attribute)
        if let Some(other) = index.values().find(|r| {
            r.id != response.id
                && r.application_id == response.application_id
                && r.attribute_key == response.attribute_key
        }) {
            debug!(existing = %other.id, attribute = %other.attribute_key, "Duplicate response");
            return Err(CandidatureError::DuplicateResponse {
                application: response.application_id,
                attribute: response.attribute_key.clone(),
            });
        }

        let mut record = response.clone();
        // Unit-of-work state stays with the caller
        record.held_blobs.clear();
        record.rejected_uploads.clear();
        let dropped = dedup_links(&mut record.attachments);
        if dropped > 0 {
            debug!(response = %record.id, dropped, "Ignored duplicate attachment links");
        }
        index.insert(record.id, record);
        self.backend.save_responses(&index)
    }

    fn get(&self, id: &Uuid) -> Result<Response> {
        let index = self.backend.load_responses()?;
        index
            .get(id)
            .cloned()
            .ok_or(CandidatureError::ResponseNotFound(*id))
    }

    fn find(&self, application: &Uuid, attribute: &str) -> Result<Option<Response>> {
        let index = self.backend.load_responses()?;
        Ok(index
            .into_values()
            .find(|r| r.application_id == *application && r.attribute_key == attribute))
    }

    fn list(&self, application: &Uuid) -> Result<Vec<Response>> {
        let index = self.backend.load_responses()?;
        let mut responses: Vec<Response> = index
            .into_values()
            .filter(|r| r.application_id == *application)
            .collect();
        responses.sort_by(|a, b| a.attribute_key.cmp(&b.attribute_key));
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachments::{checksum, Blob, BlobId};
    use crate::catalog::CatalogEntry;
    use crate::store::memory::InMemoryStore;
    use crate::variants::VariantKind;
    use std::collections::BTreeMap;

    fn response(application: Uuid, key: &str) -> Response {
        Response::new(application, &CatalogEntry::new(key, VariantKind::FileUpload))
    }

    fn blob(data: &[u8]) -> Blob {
        Blob {
            id: BlobId::for_content(data),
            filename: "a.pdf".into(),
            content_type: "application/pdf".into(),
            byte_size: data.len() as u64,
            checksum: checksum(data),
        }
    }

    #[test]
    fn save_and_get() {
        let mut store = InMemoryStore::new();
        let r = response(Uuid::new_v4(), "kbis");
        store.save(&r).unwrap();
        assert_eq!(store.get(&r.id).unwrap().attribute_key, "kbis");
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        match store.get(&id) {
            Err(CandidatureError::ResponseNotFound(err_id)) => assert_eq!(err_id, id),
            other => panic!("Expected ResponseNotFound, got {:?}", other.map(|r| r.id)),
        }
    }

    #[test]
    fn second_response_for_same_pair_is_rejected() {
        let mut store = InMemoryStore::new();
        let application = Uuid::new_v4();
        store.save(&response(application, "kbis")).unwrap();

        let err = store.save(&response(application, "kbis")).unwrap_err();
        assert!(matches!(err, CandidatureError::DuplicateResponse { .. }));

        // Same attribute, other application is fine
        store.save(&response(Uuid::new_v4(), "kbis")).unwrap();
    }

    #[test]
    fn resaving_same_response_updates_it() {
        let mut store = InMemoryStore::new();
        let mut r = response(Uuid::new_v4(), "kbis");
        store.save(&r).unwrap();
        r.hidden = true;
        store.save(&r).unwrap();
        assert!(store.get(&r.id).unwrap().hidden);
        assert_eq!(store.list(&r.application_id).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_links_collapse_on_save() {
        let mut store = InMemoryStore::new();
        let mut r = response(Uuid::new_v4(), "kbis");
        // Bypass Response::attach to simulate two racing writers.
        r.attachments.push(AttachmentRef::new(blob(b"a"), BTreeMap::new()));
        r.attachments.push(AttachmentRef::new(blob(b"a"), BTreeMap::new()));
        r.attachments.push(AttachmentRef::new(blob(b"b"), BTreeMap::new()));
        store.save(&r).unwrap();

        let stored = store.get(&r.id).unwrap();
        assert_eq!(stored.attachments.len(), 2);
    }

    #[test]
    fn list_is_per_application_and_sorted() {
        let mut store = InMemoryStore::new();
        let application = Uuid::new_v4();
        store.save(&response(application, "zeta")).unwrap();
        store.save(&response(application, "alpha")).unwrap();
        store.save(&response(Uuid::new_v4(), "beta")).unwrap();

        let keys: Vec<String> = store
            .list(&application)
            .unwrap()
            .into_iter()
            .map(|r| r.attribute_key)
            .collect();
        assert_eq!(keys, vec!["alpha", "zeta"]);
        assert!(store.find(&application, "alpha").unwrap().is_some());
        assert!(store.find(&application, "beta").unwrap().is_none());
    }

    #[test]
    fn saved_record_holds_no_blob_references() {
        let mut store = InMemoryStore::new();
        let mut r = response(Uuid::new_v4(), "kbis");
        r.held_blobs.push(BlobId::for_content(b"kbis"));
        store.save(&r).unwrap();

        assert!(store.get(&r.id).unwrap().held_blobs.is_empty());
        assert_eq!(r.held_blobs.len(), 1);
    }

    #[test]
    fn write_failure_keeps_previous_state() {
        let mut store = InMemoryStore::new();
        let mut r = response(Uuid::new_v4(), "kbis");
        store.save(&r).unwrap();

        store.backend.set_simulate_write_error(true);
        r.attachments.push(AttachmentRef::new(blob(b"a"), BTreeMap::new()));
        assert!(matches!(store.save(&r), Err(CandidatureError::Store(_))));
        assert!(store.get(&r.id).unwrap().attachments.is_empty());
    }
}
