use crate::attachments::AttachmentStore;
use crate::error::Result;
use crate::input::FormInput;
use crate::model::{Response, Source};
use crate::rules::AssignContext;
use crate::variants::VariantRegistry;
use tracing::debug;

/// Fold form input into a response through its variant's rules.
///
/// Unrecognized keys are ignored and attachment failures are recorded for
/// validation, so this only fails if the variant is not registered. A manual
/// change to an auto-filled response makes it manual.
///
/// Returns whether the value or the attachments changed.
pub fn run(
    registry: &VariantRegistry,
    attachments: &dyn AttachmentStore,
    response: &mut Response,
    input: &FormInput,
) -> Result<bool> {
    let variant = registry.get(response.variant)?;
    let cx = AssignContext::new(attachments);

    response.rejected_uploads.clear();
    let value_before = response.value.clone();
    let attachments_before = response.attachments.clone();

    for rule in variant.rules() {
        rule.assign(response, input, &cx);
    }

    let changed = response.value != value_before || response.attachments != attachments_before;
    if changed {
        if response.source == Source::Auto {
            response.apply_source(Source::Manual);
        }
        response.touch();
    }
    debug!(
        response = %response.id,
        attribute = %response.attribute_key,
        changed,
        rejected = response.rejected_uploads.len(),
        "Assigned form input"
    );
    Ok(changed)
}
