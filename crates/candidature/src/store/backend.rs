use crate::error::Result;
use crate::model::Response;
use std::collections::HashMap;
use uuid::Uuid;

/// Abstract interface for raw storage I/O.
/// This trait handles the "how" of storage (filesystem vs memory),
/// while ResponseRepo handles the "what" (uniqueness, link dedup).
pub trait StorageBackend {
    /// Load every stored response record (responses.json).
    fn load_responses(&self) -> Result<HashMap<Uuid, Response>>;

    /// Replace the stored records.
    /// MUST be atomic (e.g. write to tmp then rename): a failed save leaves
    /// the previous records, and their attachment links, intact.
    fn save_responses(&self, responses: &HashMap<Uuid, Response>) -> Result<()>;
}
