use crate::api::CandidatureApi;
use crate::attachments::memory::MemBlobStore;
use crate::catalog::AttributeCatalog;
use crate::config::EngineConfig;
use crate::store::fs::FileStore;
use std::path::PathBuf;
use tempfile::TempDir;

/// A throwaway data directory for file-backed tests.
pub struct TestEnv {
    // We keep _temp_dir to ensure the directory is not dropped until the test is done
    pub _temp_dir: TempDir,
    pub root: PathBuf,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    /// Open a store over the directory. Each call sees what earlier stores wrote.
    pub fn store(&self) -> FileStore {
        FileStore::open(self.root.clone())
    }

    /// A file-backed API with a fresh in-memory attachment store.
    pub fn api(&self, catalog: AttributeCatalog) -> CandidatureApi<FileStore, MemBlobStore> {
        CandidatureApi::new(
            self.store(),
            MemBlobStore::new("test-env").expect("signing secret"),
            catalog,
            EngineConfig::default(),
        )
        .expect("registry builds")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;
    use crate::input::FormInput;
    use crate::store::ResponseStore;
    use crate::variants::VariantKind;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn api_writes_are_visible_to_a_new_store() {
        let env = TestEnv::new();
        let catalog =
            AttributeCatalog::new(vec![CatalogEntry::new("phone", VariantKind::Phone).mandatory()])
                .unwrap();
        let mut api = env.api(catalog);
        let application = Uuid::new_v4();
        api.submit(
            application,
            "phone",
            &FormInput::new().with("text", "+33 1 23 45 67 89"),
        )
        .unwrap();

        let reopened = env.store();
        let saved = reopened.find(&application, "phone").unwrap().unwrap();
        assert_eq!(saved.value.get("text"), Some(&json!("+33 1 23 45 67 89")));
    }
}
