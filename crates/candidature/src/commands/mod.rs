//! # Command Layer
//!
//! This module contains the **core business logic** of the engine. Each
//! command lives in its own submodule and implements plain Rust functions
//! over domain types.
//!
//! ## Role and Responsibilities
//!
//! - Drive a response's variant rules through assign, normalize, and validate
//! - Decide provenance transitions
//! - Enforce "validate before persist" and clean up blobs of refused persists
//! - Build export payloads and provenance reports
//!
//! ## What Commands Do NOT Do
//!
//! - **Own storage**: they take a [`ResponseStore`](crate::store::ResponseStore)
//!   and an [`AttachmentStore`](crate::attachments::AttachmentStore)
//! - **Render messages**: error sets carry codes; localization is external
//! - **Network I/O**: registry lookups happen elsewhere; commands only consume
//!   their results
//!
//! ## Testing Strategy
//!
//! Command tests use `InMemoryStore` and `MemBlobStore` to avoid filesystem
//! dependencies and exercise every branch through real variant compositions.
//!
//! ## Command Modules
//!
//! - [`responses`]: Find-or-initialize, hide and unhide
//! - [`assign`]: Fold form input into a response
//! - [`autofill`]: Apply registry extractions and record lookup failures
//! - [`validate`]: Normalize and validate
//! - [`persist`]: Validate, then save with attachment links
//! - [`export`]: Response payloads and provenance report

pub mod assign;
pub mod autofill;
pub mod export;
pub mod persist;
pub mod responses;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::attachments::memory::MemBlobStore;
    use crate::catalog::CatalogEntry;
    use crate::config::EngineConfig;
    use crate::model::Response;
    use crate::variants::{VariantKind, VariantRegistry};
    use uuid::Uuid;

    pub struct Harness {
        pub config: EngineConfig,
        pub registry: VariantRegistry,
        pub blobs: MemBlobStore,
    }

    impl Harness {
        pub fn new() -> Self {
            let config = EngineConfig::default();
            let registry = VariantRegistry::new(&config).unwrap();
            Self {
                config,
                registry,
                blobs: MemBlobStore::new("test-secret").unwrap(),
            }
        }

        pub fn response(&self, kind: VariantKind, mandatory: bool) -> Response {
            let mut entry = CatalogEntry::new(kind.as_str(), kind);
            entry.mandatory = mandatory;
            Response::new(Uuid::new_v4(), &entry)
        }
    }
}
