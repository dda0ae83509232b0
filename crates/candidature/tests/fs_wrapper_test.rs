use candidature::attachments::memory::MemBlobStore;
use candidature::catalog::{AttributeCatalog, CatalogEntry};
use candidature::commands::autofill::ExtractionOutcome;
use candidature::config::EngineConfig;
use candidature::input::{FileUpload, FormInput};
use candidature::model::Source;
use candidature::store::fs::FileStore;
use candidature::store::ResponseStore;
use candidature::variants::VariantKind;
use candidature::CandidatureApi;
use serde_json::json;
use std::collections::BTreeMap;
use tempfile::TempDir;
use uuid::Uuid;

fn catalog() -> AttributeCatalog {
    AttributeCatalog::new(vec![
        CatalogEntry::new("siret", VariantKind::Text)
            .mandatory()
            .with_api_name("siret"),
        CatalogEntry::new("site", VariantKind::Url).with_api_name("website"),
        CatalogEntry::new("references", VariantKind::PastDeliveries).mandatory(),
    ])
    .unwrap()
}

fn open(dir: &TempDir) -> CandidatureApi<FileStore, MemBlobStore> {
    CandidatureApi::new(
        FileStore::open(dir.path().to_path_buf()),
        MemBlobStore::new("fs").unwrap(),
        catalog(),
        EngineConfig::default(),
    )
    .unwrap()
}

#[test]
fn test_filestore_persists_through_the_api() {
    let dir = TempDir::new().unwrap();
    let application = Uuid::new_v4();

    let mut api = open(&dir);
    let outcomes = api
        .autofill(
            application,
            &BTreeMap::from([
                ("siret".to_string(), json!("12345678900011")),
                ("website".to_string(), json!("acme.fr")),
            ]),
        )
        .unwrap();
    assert!(outcomes.values().all(|o| *o == ExtractionOutcome::Applied));

    let key = api.new_item_key();
    api.submit(
        application,
        "references",
        &FormInput::new()
            .with(format!("item_{}_intitule", key), "Refonte du portail")
            .with(format!("item_{}_client", key), "Ville de Lyon")
            .with(format!("item_{}_montant", key), "120000")
            .with(
                format!("item_{}_attestation", key),
                FileUpload::new("attestation.pdf", "application/pdf", b"ok".to_vec()),
            ),
    )
    .unwrap();
    drop(api);

    let reopened = FileStore::open(dir.path().to_path_buf());
    let responses = reopened.list(&application).unwrap();
    let keys: Vec<_> = responses.iter().map(|r| r.attribute_key.as_str()).collect();
    assert_eq!(keys, vec!["references", "siret", "site"]);

    let site = &responses[2];
    assert_eq!(site.source, Source::Auto);
    assert_eq!(site.value.get("text"), Some(&json!("https://acme.fr")));

    let references = &responses[0];
    assert_eq!(references.items().len(), 1);
    assert_eq!(references.attachments.len(), 1);
    assert_eq!(references.attachments[0].blob.filename, "attestation.pdf");
}

#[test]
fn test_filestore_report_after_reopen() {
    let dir = TempDir::new().unwrap();
    let application = Uuid::new_v4();

    let mut api = open(&dir);
    let mut siret = api.response(application, "siret").unwrap();
    api.record_api_failure(&mut siret);
    api.assign(&mut siret, &FormInput::new().with("text", "12345678900011"))
        .unwrap();
    api.persist(&mut siret).unwrap();
    drop(api);

    let api = open(&dir);
    let report = api.provenance_report(&application).unwrap();
    assert_eq!(report.total, 1);
    assert_eq!(report.manual_after_api_failure, 1);
    assert_eq!(report.auto_fill_rate(), 0.0);
}
