//! Export and reporting over an application's persisted responses.
//!
//! [`run`] builds one [`ResponsePayload`] per response, ordered by attribute
//! key, with attachment blob metadata and freshly signed references for
//! download. [`provenance_report`] counts responses by source.

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use crate::attachments::AttachmentStore;
use crate::error::Result;
use crate::model::{AttachmentRef, Response, Source};
use crate::store::ResponseStore;
use crate::value::ValueMap;
use crate::variants::VariantKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttachmentPayload {
    pub blob_id: String,
    pub filename: String,
    pub content_type: String,
    pub byte_size: u64,
    pub checksum: String,
    pub metadata: BTreeMap<String, String>,
    pub signed_ref: String,
}

impl AttachmentPayload {
    fn from_ref(link: &AttachmentRef, attachments: &dyn AttachmentStore) -> Self {
        Self {
            blob_id: link.blob.id.to_string(),
            filename: link.blob.filename.clone(),
            content_type: link.blob.content_type.clone(),
            byte_size: link.blob.byte_size,
            checksum: link.blob.checksum.clone(),
            metadata: link.metadata.clone(),
            signed_ref: attachments.sign(&link.blob.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponsePayload {
    pub attribute_key: String,
    pub variant: VariantKind,
    pub value: ValueMap,
    pub source: Source,
    pub hidden: bool,
    pub attachments: Vec<AttachmentPayload>,
}

impl ResponsePayload {
    pub fn from_response(response: &Response, attachments: &dyn AttachmentStore) -> Self {
        Self {
            attribute_key: response.attribute_key.clone(),
            variant: response.variant,
            value: response.value.clone(),
            source: response.source,
            hidden: response.hidden,
            attachments: response
                .attachments
                .iter()
                .map(|link| AttachmentPayload::from_ref(link, attachments))
                .collect(),
        }
    }
}

/// Payloads of every persisted response of an application.
pub fn run<S: ResponseStore>(
    store: &S,
    attachments: &dyn AttachmentStore,
    application: &Uuid,
) -> Result<Vec<ResponsePayload>> {
    Ok(store
        .list(application)?
        .iter()
        .map(|response| ResponsePayload::from_response(response, attachments))
        .collect())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProvenanceReport {
    pub manual: usize,
    pub auto: usize,
    pub manual_after_api_failure: usize,
    pub total: usize,
}

impl ProvenanceReport {
    fn count(&mut self, source: Source) {
        match source {
            Source::Manual => self.manual += 1,
            Source::Auto => self.auto += 1,
            Source::ManualAfterApiFailure => self.manual_after_api_failure += 1,
        }
        self.total += 1;
    }

    /// Share of responses filled from a registry, in `[0, 1]`.
    pub fn auto_fill_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.auto as f64 / self.total as f64
        }
    }
}

pub fn provenance_report<S: ResponseStore>(store: &S, application: &Uuid) -> Result<ProvenanceReport> {
    let mut report = ProvenanceReport::default();
    for response in store.list(application)? {
        report.count(response.source);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachments::memory::MemBlobStore;
    use crate::input::FileUpload;
    use crate::store::memory::fixtures::StoreFixture;
    use serde_json::json;

    #[test]
    fn exports_in_key_order() {
        let blobs = MemBlobStore::new("s").unwrap();
        let fixture = StoreFixture::new()
            .with_text("siret", "12345678900011")
            .with_text("company_name", "ACME");

        let payloads = run(&fixture.store, &blobs, &fixture.application).unwrap();
        let keys: Vec<_> = payloads.iter().map(|p| p.attribute_key.as_str()).collect();
        assert_eq!(keys, vec!["company_name", "siret"]);
        assert_eq!(payloads[0].value.get("text"), Some(&json!("ACME")));
    }

    #[test]
    fn attachments_carry_resolvable_signed_refs() {
        let blobs = MemBlobStore::new("s").unwrap();
        let stored = blobs
            .put(&FileUpload::new("k.pdf", "application/pdf", b"kbis".to_vec()))
            .unwrap();
        let mut fixture = StoreFixture::new().with_text("kbis", "see file");
        let mut response = fixture.store.list(&fixture.application).unwrap().remove(0);
        response.attach(stored.blob.clone(), BTreeMap::new());
        fixture.store.save(&response).unwrap();

        let payloads = run(&fixture.store, &blobs, &fixture.application).unwrap();
        let attachment = &payloads[0].attachments[0];
        assert_eq!(attachment.filename, "k.pdf");
        assert_eq!(attachment.byte_size, 4);
        assert_eq!(blobs.resolve(&attachment.signed_ref).unwrap(), stored.blob);
    }

    #[test]
    fn payload_serializes_snake_case_tags() {
        let blobs = MemBlobStore::new("s").unwrap();
        let fixture = StoreFixture::new().with_auto_text("naf", "62.01Z");
        let payloads = run(&fixture.store, &blobs, &fixture.application).unwrap();
        let json = serde_json::to_value(&payloads[0]).unwrap();
        assert_eq!(json["source"], json!("auto"));
        assert_eq!(json["variant"], json!("text"));
    }

    #[test]
    fn provenance_counts_by_source() {
        let fixture = StoreFixture::new()
            .with_text("a", "typed")
            .with_auto_text("b", "registry")
            .with_auto_text("c", "registry")
            .with_failed_lookup("d");

        let report = provenance_report(&fixture.store, &fixture.application).unwrap();
        assert_eq!(
            report,
            ProvenanceReport {
                manual: 1,
                auto: 2,
                manual_after_api_failure: 1,
                total: 4,
            }
        );
        assert!((report.auto_fill_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_application_has_zero_rate() {
        let fixture = StoreFixture::new();
        let report = provenance_report(&fixture.store, &fixture.application).unwrap();
        assert_eq!(report.total, 0);
        assert_eq!(report.auto_fill_rate(), 0.0);
    }
}
