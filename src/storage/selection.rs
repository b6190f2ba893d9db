//! Which response template the catcher currently replays.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::storage::json_file::{read_or_default, write_pretty};
use crate::storage::StoreResult;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Selection {
    #[serde(default)]
    template_name: Option<String>,
}

/// Single-record store behind `response_template.json`.
#[derive(Debug)]
pub struct SelectionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SelectionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The selected template name, if any. Empty names count as none.
    pub fn get(&self) -> Option<String> {
        read_or_default::<Selection>(&self.path)
            .template_name
            .filter(|name| !name.is_empty())
    }

    /// Select `name`, or clear the selection with `None` / `""`.
    pub fn set(&self, name: Option<&str>) -> StoreResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let selection = Selection {
            template_name: name.filter(|n| !n.is_empty()).map(str::to_string),
        };
        write_pretty(&self.path, &selection)?;

        tracing::info!(template = ?selection.template_name, "Response template selection updated");
        Ok(())
    }
}
