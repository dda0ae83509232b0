//! # File Attachment Rule
//!
//! Manages a response's ordered attachment list.
//!
//! ## Attaching
//!
//! [`attach_input`] accepts either a fresh upload or a signed reference to a
//! blob already in the store (the direct-upload path). Uploads are stored
//! through [`AttachmentStore::put`]; signed references go through
//! [`AttachmentStore::resolve`] and then [`AttachmentStore::retain`]. Either
//! way the response holds one blob reference per new link, remembered so an
//! aborted persist can release exactly what this unit of work took.
//!
//! An uploaded link carries the upload's own filename and content type. Equal
//! bytes share a blob, but each upload is validated under the name it was
//! submitted with.
//!
//! Neither path propagates failures. A store error or a
//! [`ResolveError`](crate::attachments::ResolveError) is logged and recorded as
//! a rejected upload, which validation reports on `documents`.
//!
//! Linking the same blob into the same slot twice is a no-op, so resubmitting
//! an unchanged form does not duplicate links.
//!
//! ## Validation
//!
//! Every attached blob is checked against [`FileLimits`]: content-type
//! whitelist, positive size up to the configured maximum, and a non-empty
//! filename within the length limit. Each offending file yields exactly one
//! `documents` error listing all of its problems; checking continues past the
//! first bad file.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use super::{AssignContext, FieldRule};
use crate::attachments::{AttachmentStore, Blob, BlobId};
use crate::config::EngineConfig;
use crate::input::{FormInput, InputValue};
use crate::model::{RejectedUpload, Response};
use crate::validation::{ErrorCode, ErrorSet, ValidationContext};

/// Form key and error field for general documents.
pub const DOCUMENTS_KEY: &str = "documents";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLimits {
    pub max_file_size: u64,
    pub max_filename_length: usize,
    pub allowed_content_types: Vec<String>,
}

impl FileLimits {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_file_size: config.max_file_size,
            max_filename_length: config.max_filename_length,
            allowed_content_types: config.allowed_content_types(),
        }
    }

    fn allows_content_type(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&essence))
    }

    /// Problems with one blob, empty if it is acceptable.
    pub fn problems(&self, blob: &Blob) -> Vec<String> {
        let mut problems = Vec::new();
        if !self.allows_content_type(&blob.content_type) {
            problems.push(format!("content type {} is not allowed", blob.content_type));
        }
        if blob.byte_size == 0 {
            problems.push("file is empty".to_string());
        } else if blob.byte_size > self.max_file_size {
            problems.push(format!(
                "file is larger than {} bytes",
                self.max_file_size
            ));
        }
        let name_len = blob.filename.chars().count();
        if blob.filename.trim().is_empty() {
            problems.push("filename is missing".to_string());
        } else if name_len > self.max_filename_length {
            problems.push(format!(
                "filename is longer than {} characters",
                self.max_filename_length
            ));
        }
        problems
    }
}

/// What [`attach_input`] did with one submitted value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttachOutcome {
    /// Files resolved or stored and linked (including no-op relinks).
    pub linked: usize,
    /// Files that could not be stored or resolved.
    pub rejected: usize,
}

impl AttachOutcome {
    fn merge(&mut self, other: AttachOutcome) {
        self.linked += other.linked;
        self.rejected += other.rejected;
    }
}

/// Link a blob the response already holds a reference on, keeping the
/// reference only if the link is new.
fn link_held(
    response: &mut Response,
    blob: Blob,
    metadata: &BTreeMap<String, String>,
    attachments: &dyn AttachmentStore,
) {
    let id: BlobId = blob.id.clone();
    if response.attach(blob, metadata.clone()) {
        response.held_blobs.push(id);
    } else if let Err(e) = attachments.release(&id) {
        warn!(response = %response.id, blob = %id, error = %e, "Failed to release blob");
    }
}

/// Store or resolve every file in `input` and link it with `metadata`.
///
/// Scalars are ignored; callers decide what a non-file value means.
pub fn attach_input(
    response: &mut Response,
    input: &InputValue,
    metadata: &BTreeMap<String, String>,
    cx: &AssignContext<'_>,
) -> AttachOutcome {
    let mut outcome = AttachOutcome::default();
    match input {
        InputValue::Scalar(_) => {}
        InputValue::Many(values) => {
            for value in values {
                outcome.merge(attach_input(response, value, metadata, cx));
            }
        }
        InputValue::Upload(upload) => match cx.attachments.put(upload) {
            Ok(stored) => {
                debug!(
                    response = %response.id,
                    blob = %stored.blob.id,
                    created = stored.created,
                    "Attaching upload"
                );
                let blob = Blob {
                    filename: upload.filename.clone(),
                    content_type: upload.content_type.clone(),
                    ..stored.blob
                };
                link_held(response, blob, metadata, cx.attachments);
                outcome.linked += 1;
            }
            Err(e) => {
                warn!(
                    response = %response.id,
                    filename = %upload.filename,
                    error = %e,
                    "Upload could not be stored"
                );
                response.rejected_uploads.push(RejectedUpload {
                    reason: format!("{} could not be stored", upload.filename),
                });
                outcome.rejected += 1;
            }
        },
        InputValue::SignedRef(signed) => match cx.attachments.resolve(signed) {
            Ok(blob) => match cx.attachments.retain(&blob.id) {
                Ok(()) => {
                    debug!(response = %response.id, blob = %blob.id, "Attaching signed reference");
                    link_held(response, blob, metadata, cx.attachments);
                    outcome.linked += 1;
                }
                Err(e) => {
                    warn!(response = %response.id, blob = %blob.id, error = %e, "Blob vanished after resolution");
                    response.rejected_uploads.push(RejectedUpload {
                        reason: "document reference is invalid".to_string(),
                    });
                    outcome.rejected += 1;
                }
            },
            Err(e) => {
                warn!(response = %response.id, error = %e, "Signed reference rejected");
                response.rejected_uploads.push(RejectedUpload {
                    reason: "document reference is invalid".to_string(),
                });
                outcome.rejected += 1;
            }
        },
    }
    outcome
}

#[derive(Debug, Clone)]
pub struct FileRule {
    pub limits: FileLimits,
}

impl FileRule {
    pub fn new(limits: FileLimits) -> Self {
        Self { limits }
    }
}

impl FieldRule for FileRule {
    fn name(&self) -> &'static str {
        "files"
    }

    fn assign(&self, response: &mut Response, input: &FormInput, cx: &AssignContext<'_>) {
        if let Some(documents) = input.get(DOCUMENTS_KEY) {
            attach_input(response, documents, &BTreeMap::new(), cx);
        }
    }

    fn validate(&self, response: &Response, _cx: &ValidationContext<'_>, errors: &mut ErrorSet) {
        let mut seen = BTreeSet::new();
        for attachment in &response.attachments {
            let blob = &attachment.blob;
            if !seen.insert((&blob.id, &blob.filename, &blob.content_type)) {
                continue;
            }
            let problems = self.limits.problems(blob);
            if !problems.is_empty() {
                let name = if blob.filename.trim().is_empty() {
                    "unnamed file"
                } else {
                    blob.filename.as_str()
                };
                errors.add(
                    DOCUMENTS_KEY,
                    ErrorCode::Invalid,
                    format!("{} is invalid: {}", name, problems.join(", ")),
                );
            }
        }
        for rejected in &response.rejected_uploads {
            errors.add(DOCUMENTS_KEY, ErrorCode::Invalid, rejected.reason.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachments::memory::MemBlobStore;
    use crate::attachments::{AttachmentStore, BlobId};
    use crate::catalog::CatalogEntry;
    use crate::input::FileUpload;
    use crate::variants::VariantKind;
    use uuid::Uuid;

    fn setup() -> (MemBlobStore, Response, FileRule, EngineConfig) {
        let config = EngineConfig::default();
        (
            MemBlobStore::new("secret").unwrap(),
            Response::new(Uuid::new_v4(), &CatalogEntry::new("a", VariantKind::FileUpload)),
            FileRule::new(FileLimits::from_config(&config)),
            config,
        )
    }

    fn pdf(name: &str, data: &[u8]) -> FileUpload {
        FileUpload::new(name, "application/pdf", data.to_vec())
    }

    fn validate(rule: &FileRule, response: &Response, config: &EngineConfig) -> ErrorSet {
        let mut errors = ErrorSet::new();
        rule.validate(response, &ValidationContext::new(config), &mut errors);
        errors
    }

    #[test]
    fn upload_is_stored_and_linked_once() {
        let (store, mut response, rule, config) = setup();
        let cx = AssignContext::new(&store);
        let input = FormInput::new().with(DOCUMENTS_KEY, pdf("kbis.pdf", b"kbis"));

        rule.assign(&mut response, &input, &cx);
        rule.assign(&mut response, &input, &cx);

        assert_eq!(response.attachments.len(), 1);
        assert_eq!(response.held_blobs.len(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.refs(&response.attachments[0].blob.id), 1);
        assert!(validate(&rule, &response, &config).is_empty());
    }

    #[test]
    fn signed_reference_links_existing_blob() {
        let (store, mut response, _, _) = setup();
        let stored = store.put(&pdf("a.pdf", b"a")).unwrap();
        let signed = store.sign(&stored.blob.id);

        let outcome = attach_input(
            &mut response,
            &InputValue::SignedRef(signed),
            &BTreeMap::new(),
            &AssignContext::new(&store),
        );
        assert_eq!(outcome, AttachOutcome { linked: 1, rejected: 0 });
        assert_eq!(response.attachments[0].blob.id, stored.blob.id);
        assert_eq!(response.held_blobs, vec![stored.blob.id.clone()]);
        assert_eq!(store.refs(&stored.blob.id), 2);
    }

    #[test]
    fn missing_blob_reference_becomes_documents_error() {
        let (store, mut response, rule, config) = setup();
        let signed = store.sign(&BlobId::for_content(b"never stored"));
        rule.assign(
            &mut response,
            &FormInput::new().with(DOCUMENTS_KEY, InputValue::SignedRef(signed)),
            &AssignContext::new(&store),
        );

        assert!(response.attachments.is_empty());
        assert!(response.held_blobs.is_empty());
        let errors = validate(&rule, &response, &config);
        assert_eq!(errors.codes(DOCUMENTS_KEY), vec![ErrorCode::Invalid]);
        assert_eq!(
            errors.messages(DOCUMENTS_KEY),
            vec!["document reference is invalid"]
        );
    }

    #[test]
    fn corrupted_blob_reference_becomes_documents_error() {
        let (store, mut response, rule, config) = setup();
        let stored = store.put(&pdf("a.pdf", b"a")).unwrap();
        assert!(store.corrupt(&stored.blob.id));
        rule.assign(
            &mut response,
            &FormInput::new().with(
                DOCUMENTS_KEY,
                InputValue::SignedRef(store.sign(&stored.blob.id)),
            ),
            &AssignContext::new(&store),
        );

        assert!(response.attachments.is_empty());
        assert_eq!(store.refs(&stored.blob.id), 1);
        let errors = validate(&rule, &response, &config);
        assert_eq!(errors.codes(DOCUMENTS_KEY), vec![ErrorCode::Invalid]);
    }

    #[test]
    fn bad_signature_becomes_documents_error() {
        let (store, mut response, rule, config) = setup();
        let forged = format!("{}--deadbeef", BlobId::for_content(b"x"));
        rule.assign(
            &mut response,
            &FormInput::new().with(DOCUMENTS_KEY, InputValue::SignedRef(forged)),
            &AssignContext::new(&store),
        );

        assert!(response.attachments.is_empty());
        let errors = validate(&rule, &response, &config);
        assert_eq!(errors.codes(DOCUMENTS_KEY), vec![ErrorCode::Invalid]);
    }

    #[test]
    fn store_failure_is_not_propagated() {
        let (store, mut response, rule, config) = setup();
        store.set_simulate_put_error(true);
        rule.assign(
            &mut response,
            &FormInput::new().with(DOCUMENTS_KEY, pdf("a.pdf", b"a")),
            &AssignContext::new(&store),
        );
        assert!(response.attachments.is_empty());
        assert_eq!(validate(&rule, &response, &config).len(), 1);
    }

    #[test]
    fn each_bad_file_gets_one_error() {
        let (store, mut response, rule, config) = setup();
        let long_name = format!("{}.pdf", "x".repeat(296));
        let files = InputValue::Many(vec![
            pdf(&long_name, b"one").into(),
            pdf("ok.pdf", b"two").into(),
            FileUpload::new("script.exe", "application/x-msdownload", Vec::new()).into(),
        ]);
        rule.assign(
            &mut response,
            &FormInput::new().with(DOCUMENTS_KEY, files),
            &AssignContext::new(&store),
        );

        let errors = validate(&rule, &response, &config);
        let messages = errors.messages(DOCUMENTS_KEY);
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("filename is longer than 255 characters"));
        assert!(messages[1].contains("content type application/x-msdownload is not allowed"));
        assert!(messages[1].contains("file is empty"));
        assert!(!messages.iter().any(|m| m.starts_with("ok.pdf")));
    }

    #[test]
    fn reuploaded_bytes_are_checked_under_their_new_name() {
        let (store, mut first, rule, config) = setup();
        rule.assign(
            &mut first,
            &FormInput::new().with(DOCUMENTS_KEY, pdf("ok.pdf", b"same bytes")),
            &AssignContext::new(&store),
        );
        assert!(validate(&rule, &first, &config).is_empty());

        let mut second = Response::new(
            Uuid::new_v4(),
            &CatalogEntry::new("b", VariantKind::FileUpload),
        );
        let long_name = format!("{}.exe", "x".repeat(296));
        rule.assign(
            &mut second,
            &FormInput::new().with(
                DOCUMENTS_KEY,
                FileUpload::new(&long_name, "application/x-msdownload", b"same bytes".to_vec()),
            ),
            &AssignContext::new(&store),
        );

        assert_eq!(store.len(), 1);
        assert_eq!(first.attachments[0].blob.id, second.attachments[0].blob.id);
        assert_eq!(second.attachments[0].blob.filename, long_name);
        assert_eq!(first.attachments[0].blob.filename, "ok.pdf");

        let errors = validate(&rule, &second, &config);
        let messages = errors.messages(DOCUMENTS_KEY);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("content type application/x-msdownload is not allowed"));
        assert!(messages[0].contains("filename is longer than 255 characters"));
    }

    #[test]
    fn limits_accept_content_type_parameters() {
        let config = EngineConfig::default();
        let limits = FileLimits::from_config(&config);
        assert!(limits.allows_content_type("Application/PDF; charset=binary"));
        assert!(!limits.allows_content_type("text/html"));
    }

    #[test]
    fn oversized_file_is_rejected() {
        let limits = FileLimits {
            max_file_size: 4,
            max_filename_length: 255,
            allowed_content_types: vec!["application/pdf".into()],
        };
        let blob = Blob {
            id: BlobId::for_content(b"12345"),
            filename: "big.pdf".into(),
            content_type: "application/pdf".into(),
            byte_size: 5,
            checksum: String::new(),
        };
        assert_eq!(limits.problems(&blob), vec!["file is larger than 4 bytes"]);
    }
}
