use super::backend::StorageBackend;
use crate::error::{CandidatureError, Result};
use crate::model::Response;
use std::cell::RefCell;
use std::collections::HashMap;
use uuid::Uuid;

/// In-memory storage backend for testing.
///
/// Uses `RefCell` for interior mutability since a unit of work is
/// single-threaded. This avoids the overhead of `RwLock` while still allowing
/// the `StorageBackend` trait to use `&self` for all methods.
#[derive(Default)]
pub struct MemBackend {
    responses: RefCell<HashMap<Uuid, Response>>,
    simulate_write_error: RefCell<bool>,
    writes: RefCell<usize>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        *self.simulate_write_error.borrow_mut() = simulate;
    }

    /// Number of successful saves, for asserting that refused persists
    /// never reach storage.
    pub fn write_count(&self) -> usize {
        *self.writes.borrow()
    }
}

impl StorageBackend for MemBackend {
    fn load_responses(&self) -> Result<HashMap<Uuid, Response>> {
        Ok(self.responses.borrow().clone())
    }

    fn save_responses(&self, responses: &HashMap<Uuid, Response>) -> Result<()> {
        if *self.simulate_write_error.borrow() {
            return Err(CandidatureError::Store("Simulated write error".to_string()));
        }
        *self.responses.borrow_mut() = responses.clone();
        *self.writes.borrow_mut() += 1;
        Ok(())
    }
}
