//! # Candidature Architecture
//!
//! Candidature is the **response storage and validation engine** behind a
//! multi-step procurement application form. Every question of the form is an
//! attribute from a catalog; every answer is one [`model::Response`] record,
//! whatever its shape: a phone number, a checkbox with evidence, a yes/no
//! question with conditional justification, three years of turnover, or an
//! open-ended list of team members with CVs.
//!
//! ## The Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade over commands                                │
//! │  - Owns store, attachment store, catalog, variant registry  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - assign, autofill, validate, persist, export              │
//! │  - Operates on Rust types, returns Rust types               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Variants and Rules (variants/, rules/)                     │
//! │  - One Variant per kind: a schema plus ordered FieldRules   │
//! │  - Rules assign, normalize, and validate the value          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage (store/, attachments/)                             │
//! │  - ResponseStore: FileStore, InMemoryStore                  │
//! │  - AttachmentStore: content-addressed blobs, signed refs    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: User Input Never Raises
//!
//! Anything an applicant can type or upload ends up as an entry in an
//! [`validation::ErrorSet`], never as an `Err`. Errors are reserved for
//! storage failures, unknown attributes, refused persists
//! ([`error::CandidatureError::ValidationFailed`]), and registry
//! misconfiguration detected at startup.
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and never installs a subscriber.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade, entry point for all operations
//! - [`commands`]: Business logic for each operation
//! - [`variants`]: Variant kinds and the registry composing their rules
//! - [`rules`]: The composable field rules
//! - [`items`]: Repeatable item keys, schemas, and pruning
//! - [`model`]: `Response`, `Source`, `AttachmentRef`
//! - [`value`]: Blank, presence, and boolean-cast helpers over JSON values
//! - [`input`]: Raw form input
//! - [`catalog`]: Attribute catalog entries
//! - [`validation`]: Error sets and the validation context
//! - [`attachments`]: Blob storage abstraction
//! - [`store`]: Response storage abstraction and implementations
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod api;
pub mod attachments;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod error;
pub mod input;
pub mod items;
pub mod model;
pub mod rules;
pub mod store;
pub mod validation;
pub mod value;
pub mod variants;

#[cfg(test)]
pub(crate) mod test_utils;

pub use api::CandidatureApi;
pub use error::{CandidatureError, Result};
