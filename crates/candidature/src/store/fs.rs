use super::fs_backend::FsBackend;
use super::response_store::ResponseRepo;
use std::path::PathBuf;

/// Response store persisted as a JSON file under `root`.
pub type FileStore = ResponseRepo<FsBackend>;

impl FileStore {
    pub fn open(root: PathBuf) -> Self {
        ResponseRepo::with_backend(FsBackend::new(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;
    use crate::model::Response;
    use crate::store::ResponseStore;
    use crate::variants::VariantKind;
    use uuid::Uuid;

    #[test]
    fn records_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let application = Uuid::new_v4();
        let response = Response::new(
            application,
            &CatalogEntry::new("effectifs", VariantKind::YearlyWorkforce),
        );

        let mut store = FileStore::open(dir.path().to_path_buf());
        store.save(&response).unwrap();
        drop(store);

        let reopened = FileStore::open(dir.path().to_path_buf());
        let loaded = reopened.find(&application, "effectifs").unwrap().unwrap();
        assert_eq!(loaded.id, response.id);
        assert_eq!(loaded.variant, VariantKind::YearlyWorkforce);
    }
}
