use thiserror::Error;
use uuid::Uuid;

use crate::validation::ErrorSet;

#[derive(Error, Debug)]
pub enum CandidatureError {
    #[error("Response not found: {0}")]
    ResponseNotFound(Uuid),

    #[error("A response for attribute '{attribute}' already exists on application {application}")]
    DuplicateResponse { application: Uuid, attribute: String },

    /// Persist was refused because the response did not validate.
    ///
    /// Carries the error set of the refused pass so callers can render it.
    #[error("Validation failed: {0}")]
    ValidationFailed(ErrorSet),

    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    /// A variant is missing declarations it needs. Raised while building the
    /// registry, never while handling a request.
    #[error("Variant registry error: {0}")]
    Registry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Attachment error: {0}")]
    Attachment(String),
}

pub type Result<T> = std::result::Result<T, CandidatureError>;
