use crate::catalog::AttributeCatalog;
use crate::error::{CandidatureError, Result};
use crate::model::Response;
use crate::store::ResponseStore;
use tracing::debug;
use uuid::Uuid;

/// Load the response of `application` for `attribute`, or initialize a new
/// one from the catalog entry. New responses are not saved until persisted.
pub fn find_or_init<S: ResponseStore>(
    store: &S,
    catalog: &AttributeCatalog,
    application: Uuid,
    attribute: &str,
) -> Result<Response> {
    let entry = catalog
        .get(attribute)
        .ok_or_else(|| CandidatureError::UnknownAttribute(attribute.to_string()))?;

    if let Some(existing) = store.find(&application, attribute)? {
        return Ok(existing);
    }
    debug!(application = %application, attribute, variant = %entry.variant, "Initializing response");
    Ok(Response::new(application, entry))
}

/// Set the hidden flag. The value is untouched.
pub fn set_hidden<S: ResponseStore>(store: &mut S, id: &Uuid, hidden: bool) -> Result<Response> {
    let mut response = store.get(id)?;
    if response.hidden != hidden {
        response.hidden = hidden;
        response.touch();
        store.save(&response)?;
    }
    Ok(response)
}
