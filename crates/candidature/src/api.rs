//! # API Facade
//!
//! The API layer is a **thin facade** over the command layer. It is the single
//! entry point for form controllers, registry import jobs, and exports.
//!
//! ## Role and Responsibilities
//!
//! The API facade:
//! - **Owns the collaborators**: the response store, the attachment store, the
//!   attribute catalog, and the variant registry built from the configuration
//! - **Dispatches** to the appropriate command function
//! - **Returns structured types** (`Result<Response>`, `ErrorSet`, payloads)
//!
//! ## What the API Does NOT Do
//!
//! - **Business logic**: That belongs in `commands/*.rs`
//! - **Registry lookups**: callers fetch registry data and hand the
//!   extractions in; the API only decides what to do with them
//! - **Rendering**: error sets carry codes and English messages, nothing more
//!
//! ## Unit of Work
//!
//! A form step is one unit of work on one response:
//!
//! ```text
//! response() → assign() → persist()          (or submit() for all three)
//! ```
//!
//! `assign` never fails on user input. `persist` validates and refuses with
//! [`CandidatureError::ValidationFailed`] when the error set is not empty,
//! unlinking the files attached during the unit of work and releasing their
//! blobs. A blob another response still links is kept.
//!
//! ## Generic Over Stores
//!
//! `CandidatureApi<S: ResponseStore, A: AttachmentStore>`:
//! - Production: `CandidatureApi<FileStore, _>`
//! - Testing: `CandidatureApi<InMemoryStore, MemBlobStore>`

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::attachments::{AttachmentStore, Blob};
use crate::catalog::AttributeCatalog;
use crate::commands;
use crate::commands::autofill::ExtractionOutcome;
use crate::commands::export::{ProvenanceReport, ResponsePayload};
use crate::config::EngineConfig;
use crate::error::{CandidatureError, Result};
use crate::input::FormInput;
use crate::items::{ItemKey, ItemKeyGenerator};
use crate::model::Response;
use crate::store::ResponseStore;
use crate::validation::{ErrorSet, ValidationContext};
use crate::variants::VariantRegistry;

/// The main API facade for the response engine.
pub struct CandidatureApi<S: ResponseStore, A: AttachmentStore> {
    store: S,
    attachments: A,
    catalog: AttributeCatalog,
    registry: VariantRegistry,
    config: EngineConfig,
    item_keys: ItemKeyGenerator,
    today: Option<NaiveDate>,
}

impl<S: ResponseStore, A: AttachmentStore> CandidatureApi<S, A> {
    /// Build the facade. Fails if the variant registry is inconsistent.
    pub fn new(
        store: S,
        attachments: A,
        catalog: AttributeCatalog,
        config: EngineConfig,
    ) -> Result<Self> {
        let registry = VariantRegistry::new(&config)?;
        Ok(Self {
            store,
            attachments,
            catalog,
            registry,
            config,
            item_keys: ItemKeyGenerator::new(),
            today: None,
        })
    }

    /// Pin the reference date used for year and date bounds.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn attachments(&self) -> &A {
        &self.attachments
    }

    pub fn catalog(&self) -> &AttributeCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn context(&self) -> ValidationContext<'_> {
        let cx = ValidationContext::new(&self.config);
        match self.today {
            Some(today) => cx.with_today(today),
            None => cx,
        }
    }

    /// Load or initialize the response of `application` for `attribute`.
    pub fn response(&self, application: Uuid, attribute: &str) -> Result<Response> {
        commands::responses::find_or_init(&self.store, &self.catalog, application, attribute)
    }

    pub fn get_response(&self, id: &Uuid) -> Result<Response> {
        self.store.get(id)
    }

    pub fn assign(&self, response: &mut Response, input: &FormInput) -> Result<bool> {
        commands::assign::run(&self.registry, &self.attachments, response, input)
    }

    pub fn apply_extraction(&self, response: &mut Response, extracted: &Value) -> ExtractionOutcome {
        commands::autofill::apply(response, extracted)
    }

    pub fn record_api_failure(&self, response: &mut Response) {
        commands::autofill::record_api_failure(response)
    }

    pub fn reset_provenance(&self, response: &mut Response) {
        response.reset_provenance();
    }

    pub fn validate(&self, response: &mut Response) -> Result<ErrorSet> {
        commands::validate::run(&self.registry, response, &self.context())
    }

    pub fn persist(&mut self, response: &mut Response) -> Result<()> {
        let cx = ValidationContext::new(&self.config);
        let cx = match self.today {
            Some(today) => cx.with_today(today),
            None => cx,
        };
        commands::persist::run(
            &mut self.store,
            &self.registry,
            &self.attachments,
            response,
            &cx,
        )
    }

    /// Load, assign, and persist in one call.
    pub fn submit(
        &mut self,
        application: Uuid,
        attribute: &str,
        input: &FormInput,
    ) -> Result<Response> {
        let mut response = self.response(application, attribute)?;
        self.assign(&mut response, input)?;
        self.persist(&mut response)?;
        Ok(response)
    }

    /// Apply registry data to every auto-fillable attribute it covers.
    ///
    /// `extracted` is keyed by catalog `api_name`. Applied extractions are
    /// persisted; one that does not validate is reported as
    /// [`ExtractionOutcome::Rejected`] and leaves the stored response as it
    /// was.
    pub fn autofill(
        &mut self,
        application: Uuid,
        extracted: &BTreeMap<String, Value>,
    ) -> Result<BTreeMap<String, ExtractionOutcome>> {
        let targets: Vec<(String, Value)> = self
            .catalog
            .auto_fillable()
            .filter_map(|entry| {
                let api_name = entry.api_name.as_deref()?;
                extracted
                    .get(api_name)
                    .map(|value| (entry.key.clone(), value.clone()))
            })
            .collect();

        let mut outcomes = BTreeMap::new();
        for (attribute, value) in targets {
            let mut response = self.response(application, &attribute)?;
            let mut outcome = commands::autofill::apply(&mut response, &value);
            if outcome == ExtractionOutcome::Applied {
                match self.persist(&mut response) {
                    Ok(()) => {}
                    Err(CandidatureError::ValidationFailed(errors)) => {
                        warn!(
                            application = %application,
                            attribute = %attribute,
                            errors = %errors,
                            "Registry extraction did not validate"
                        );
                        outcome = ExtractionOutcome::Rejected;
                    }
                    Err(e) => return Err(e),
                }
            }
            outcomes.insert(attribute, outcome);
        }
        Ok(outcomes)
    }

    pub fn hide(&mut self, id: &Uuid) -> Result<Response> {
        commands::responses::set_hidden(&mut self.store, id, true)
    }

    pub fn unhide(&mut self, id: &Uuid) -> Result<Response> {
        commands::responses::set_hidden(&mut self.store, id, false)
    }

    pub fn export(&self, application: &Uuid) -> Result<Vec<ResponsePayload>> {
        commands::export::run(&self.store, &self.attachments, application)
    }

    pub fn provenance_report(&self, application: &Uuid) -> Result<ProvenanceReport> {
        commands::export::provenance_report(&self.store, application)
    }

    /// A fresh key for a new repeatable item in the form.
    pub fn new_item_key(&self) -> ItemKey {
        self.item_keys.next_key()
    }

    /// Resolve a signed reference and read the blob.
    pub fn open_attachment(&self, signed_ref: &str) -> Result<(Blob, Vec<u8>)> {
        let blob = self
            .attachments
            .resolve(signed_ref)
            .map_err(|e| CandidatureError::Attachment(e.to_string()))?;
        let data = self.attachments.open(&blob.id)?;
        Ok((blob, data))
    }
}
