use super::backend::StorageBackend;
use crate::error::{CandidatureError, Result};
use crate::model::Response;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const RESPONSES_FILE: &str = "responses.json";

pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn responses_path(&self) -> PathBuf {
        self.root.join(RESPONSES_FILE)
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(CandidatureError::Io)?;
        }
        Ok(())
    }
}

impl StorageBackend for FsBackend {
    fn load_responses(&self) -> Result<HashMap<Uuid, Response>> {
        let data_file = self.responses_path();
        if !data_file.exists() {
            return Ok(HashMap::new());
        }
        let content = fs::read_to_string(data_file).map_err(CandidatureError::Io)?;
        let responses: HashMap<Uuid, Response> =
            serde_json::from_str(&content).map_err(CandidatureError::Serialization)?;
        Ok(responses)
    }

    fn save_responses(&self, responses: &HashMap<Uuid, Response>) -> Result<()> {
        self.ensure_dir()?;

        let content =
            serde_json::to_string_pretty(responses).map_err(CandidatureError::Serialization)?;

        // Atomic write: records and their attachment links land together
        let tmp_file = self.root.join(format!(".responses-{}.tmp", Uuid::new_v4()));
        let written = fs::write(&tmp_file, content)
            .and_then(|()| fs::rename(&tmp_file, self.responses_path()));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_file);
            return Err(CandidatureError::Io(e));
        }

        Ok(())
    }
}
