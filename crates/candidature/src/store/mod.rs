//! # Storage Layer
//!
//! This module defines the storage abstraction for responses. The
//! [`ResponseStore`] trait allows the engine to work with different storage
//! backends.
//!
//! ## Layers
//!
//! - [`backend::StorageBackend`]: raw I/O. Loads and saves the full set of
//!   response records.
//! - [`response_store::ResponseRepo`]: business rules over any backend.
//!
//! ## Guarantees
//!
//! - **One response per (application, attribute)**: saving a second record
//!   for the same pair fails with `DuplicateResponse`.
//! - **Links travel with the record**: attachment links are embedded in the
//!   response record, so a save writes both at once. Backends must write
//!   atomically; a failed save leaves the previous state.
//! - **Link uniqueness**: a record naming the same blob twice with identical
//!   metadata is stored with one link. Two resubmissions racing past the
//!   in-memory "already attached?" check still persist a single link.
//!
//! ## Implementations
//!
//! - [`fs::FileStore`]: JSON file on disk.
//! - [`memory::InMemoryStore`]: For testing logic without filesystem I/O.
//!
//! ## Storage Layout
//!
//! ```text
//! <root>/
//! └── responses.json      # { "<response uuid>": { ...record, "attachments": [...] } }
//! ```

use crate::error::Result;
use crate::model::Response;
use uuid::Uuid;

pub mod backend;
pub mod fs;
pub mod fs_backend;
pub mod mem_backend;
pub mod memory;
pub mod response_store;

/// Abstract interface for response storage.
pub trait ResponseStore {
    /// Save a response (create or update), together with its attachment links.
    fn save(&mut self, response: &Response) -> Result<()>;

    /// Get a response by ID
    fn get(&self, id: &Uuid) -> Result<Response>;

    /// Find the response of an application for one attribute.
    fn find(&self, application: &Uuid, attribute: &str) -> Result<Option<Response>>;

    /// All responses of an application, ordered by attribute key.
    fn list(&self, application: &Uuid) -> Result<Vec<Response>>;
}
