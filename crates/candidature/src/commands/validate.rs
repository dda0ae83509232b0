use crate::error::Result;
use crate::model::{Response, Source};
use crate::rules::FieldRule;
use crate::validation::{ErrorSet, ValidationContext};
use crate::variants::{Variant, VariantRegistry};
use tracing::debug;

/// Run every rule's normalization step, in stage order.
pub fn normalize(variant: &Variant, response: &mut Response) {
    for rule in variant.rules() {
        rule.normalize(response);
    }
}

/// Normalize, then validate a response against its variant.
///
/// Normalization mutates the response (blank items pruned, hidden fields
/// dropped), so re-running on the result yields the same error set.
pub fn run(
    registry: &VariantRegistry,
    response: &mut Response,
    cx: &ValidationContext<'_>,
) -> Result<ErrorSet> {
    let variant = registry.get(response.variant)?;
    normalize(variant, response);

    let mut errors = ErrorSet::new();
    if response.source == Source::Auto && response.is_blank() {
        debug!(
            response = %response.id,
            attribute = %response.attribute_key,
            "Blank registry answer; nothing to validate"
        );
        return Ok(errors);
    }

    variant.schema.validate(response, cx, &mut errors);
    for rule in variant.rules() {
        rule.validate(response, cx, &mut errors);
    }

    debug!(
        response = %response.id,
        attribute = %response.attribute_key,
        errors = errors.len(),
        "Validated response"
    );
    Ok(errors)
}
