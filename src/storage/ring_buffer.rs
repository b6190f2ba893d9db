//! Bounded, newest-first store of captured webhook calls.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde_json::Value;

use crate::catcher::CapturedRequest;
use crate::storage::json_file::{read_or_default, write_pretty};
use crate::storage::{StoreError, StoreResult};

/// Maximum number of captures kept.
pub const RING_CAPACITY: usize = 100;

/// The last [`RING_CAPACITY`] captures, persisted as a JSON array with the
/// newest entry first.
///
/// Entries are rewritten as stored, so an entry this version cannot fully
/// read is never dropped by an append; only eviction removes entries.
#[derive(Debug)]
pub struct RequestRingBuffer {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl RequestRingBuffer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Prepend `record`, drop everything past capacity, persist, and
    /// return the resulting list.
    pub fn append(&self, record: CapturedRequest) -> StoreResult<Vec<CapturedRequest>> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let entry = serde_json::to_value(&record).map_err(|source| StoreError::Serialize {
            path: self.path.clone(),
            source,
        })?;

        let mut entries = self.read_entries();
        entries.insert(0, entry);
        entries.truncate(RING_CAPACITY);

        write_pretty(&self.path, &entries)?;
        Ok(decode(entries))
    }

    pub fn clear(&self) -> StoreResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        write_pretty(&self.path, &Vec::<Value>::new())
    }

    /// Current contents; empty when the file is absent or not a JSON array.
    pub fn list(&self) -> Vec<CapturedRequest> {
        decode(self.read_entries())
    }

    fn read_entries(&self) -> Vec<Value> {
        read_or_default(&self.path)
    }
}

/// Entries that are not objects are left out of the view.
fn decode(entries: Vec<Value>) -> Vec<CapturedRequest> {
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(request) => Some(request),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable captured request");
                None
            }
        })
        .collect()
}
