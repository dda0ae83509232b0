//! Persisting a response.
//!
//! Persist validates first and only writes an empty error set. The response
//! record embeds its attachment links, so one backend write commits the value
//! and the links together.
//!
//! Every link added during this unit of work holds one blob reference
//! (tracked on the response as held blobs). When validation refuses the write
//! or the store fails, those links are removed and their references released.
//! On success, references whose link normalization already dropped are
//! released too. Blobs are shared between responses, so a release only
//! removes a blob once no other response holds it.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::attachments::{AttachmentStore, BlobId};
use crate::commands::validate;
use crate::error::{CandidatureError, Result};
use crate::model::Response;
use crate::store::ResponseStore;
use crate::validation::ValidationContext;
use crate::variants::VariantRegistry;

fn release_all(attachments: &dyn AttachmentStore, ids: &[BlobId]) {
    for id in ids {
        if let Err(e) = attachments.release(id) {
            warn!(blob = %id, error = %e, "Failed to release blob");
        }
    }
}

/// Unlink every blob linked during this unit of work and release its reference.
fn roll_back(attachments: &dyn AttachmentStore, response: &mut Response) {
    let held: Vec<BlobId> = std::mem::take(&mut response.held_blobs);
    if held.is_empty() {
        return;
    }
    let held_set: HashSet<&BlobId> = held.iter().collect();
    response.detach_where(|a| held_set.contains(&a.blob.id));
    release_all(attachments, &held);
}

pub fn run<S: ResponseStore>(
    store: &mut S,
    registry: &VariantRegistry,
    attachments: &dyn AttachmentStore,
    response: &mut Response,
    cx: &ValidationContext<'_>,
) -> Result<()> {
    let errors = validate::run(registry, response, cx)?;
    if !errors.is_empty() {
        roll_back(attachments, response);
        return Err(CandidatureError::ValidationFailed(errors));
    }

    if let Err(e) = store.save(response) {
        warn!(
            response = %response.id,
            attribute = %response.attribute_key,
            error = %e,
            "Store write failed; releasing new attachments"
        );
        roll_back(attachments, response);
        return Err(e);
    }

    let held = std::mem::take(&mut response.held_blobs);
    let unlinked: Vec<BlobId> = held
        .into_iter()
        .filter(|id| !response.attachments.iter().any(|a| &a.blob.id == id))
        .collect();
    release_all(attachments, &unlinked);

    info!(
        response = %response.id,
        attribute = %response.attribute_key,
        source = response.source.as_str(),
        attachments = response.attachments.len(),
        "Persisted response"
    );
    Ok(())
}
