//! Registry extractions.
//!
//! An external registry lookup yields either a mapping (merged into the value
//! key by key) or a scalar (stored under the variant's primary key). Applying
//! it marks the response `auto`. Responses whose provenance is
//! `manual_after_api_failure` refuse extractions until
//! [`Response::reset_provenance`] is called.
//!
//! A blank extraction (the registry has no data) still marks the response
//! `auto`; blank auto responses validate.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::model::{Response, Source};
use crate::value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionOutcome {
    Applied,
    /// The response is `manual_after_api_failure`.
    RefusedAfterFailure,
    /// The extraction's shape does not fit the variant.
    Unsupported,
    /// Applied, but the result did not validate and was not persisted.
    Rejected,
}

fn merge(response: &mut Response, key: &str, raw: &Value) {
    match value::presence(raw) {
        Some(v) => {
            response.value.insert(key.to_string(), v);
        }
        None => {
            response.value.remove(key);
        }
    }
}

pub fn apply(response: &mut Response, extracted: &Value) -> ExtractionOutcome {
    if response.source == Source::ManualAfterApiFailure {
        // Refused; apply_source logs the attempt.
        response.apply_source(Source::Auto);
        return ExtractionOutcome::RefusedAfterFailure;
    }

    match extracted {
        Value::Object(fields) => {
            for (key, raw) in fields {
                merge(response, key, raw);
            }
        }
        Value::Null => {}
        scalar => match response.variant.primary_key() {
            Some(key) => merge(response, key, scalar),
            None => {
                warn!(
                    response = %response.id,
                    variant = %response.variant,
                    "Scalar extraction for a variant that needs a mapping"
                );
                return ExtractionOutcome::Unsupported;
            }
        },
    }

    response.apply_source(Source::Auto);
    response.touch();
    info!(
        response = %response.id,
        attribute = %response.attribute_key,
        "Applied registry extraction"
    );
    ExtractionOutcome::Applied
}

/// Record that the registry lookup failed; the applicant answers by hand.
pub fn record_api_failure(response: &mut Response) {
    if response.source != Source::ManualAfterApiFailure {
        response.apply_source(Source::ManualAfterApiFailure);
        response.touch();
    }
}
