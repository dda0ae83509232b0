use super::mem_backend::MemBackend;
use super::response_store::ResponseRepo;

pub type InMemoryStore = ResponseRepo<MemBackend>;

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        ResponseRepo::with_backend(MemBackend::new())
    }
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;
    use crate::catalog::CatalogEntry;
    use crate::model::{Response, Source};
    use crate::store::ResponseStore;
    use crate::variants::VariantKind;
    use serde_json::json;
    use uuid::Uuid;

    pub struct StoreFixture {
        pub store: InMemoryStore,
        pub application: Uuid,
    }

    impl Default for StoreFixture {
        fn default() -> Self {
            Self::new()
        }
    }

    impl StoreFixture {
        pub fn new() -> Self {
            Self {
                store: InMemoryStore::new(),
                application: Uuid::new_v4(),
            }
        }

        fn save(&mut self, response: Response) {
            self.store.save(&response).unwrap();
        }

        pub fn with_text(mut self, key: &str, text: &str) -> Self {
            let mut response =
                Response::new(self.application, &CatalogEntry::new(key, VariantKind::Text));
            response.value.insert("text".into(), json!(text));
            self.save(response);
            self
        }

        pub fn with_auto_text(mut self, key: &str, text: &str) -> Self {
            let mut response =
                Response::new(self.application, &CatalogEntry::new(key, VariantKind::Text));
            response.value.insert("text".into(), json!(text));
            response.source = Source::Auto;
            self.save(response);
            self
        }

        pub fn with_failed_lookup(mut self, key: &str) -> Self {
            let mut response =
                Response::new(self.application, &CatalogEntry::new(key, VariantKind::Text));
            response.source = Source::ManualAfterApiFailure;
            self.save(response);
            self
        }

        pub fn with_checkbox(mut self, key: &str, checked: bool) -> Self {
            let mut response =
                Response::new(self.application, &CatalogEntry::new(key, VariantKind::Checkbox));
            response.value.insert("checked".into(), json!(checked));
            self.save(response);
            self
        }
    }
}
