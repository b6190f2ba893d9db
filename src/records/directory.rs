//! Listing, reading and deleting record files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogFileError {
    #[error("log file not found")]
    NotFound,

    #[error("log file is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("log file operation failed: {0}")]
    Io(#[from] io::Error),
}

/// Names of all `*.json` files in the log directory, sorted.
///
/// A missing directory is an empty listing.
pub fn list_logs(directory: &Path) -> io::Result<Vec<String>> {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if name.ends_with(".json") {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Read one record as raw JSON.
pub fn read_log(directory: &Path, filename: &str) -> Result<serde_json::Value, LogFileError> {
    let path = resolve_within(directory, filename)?;
    let contents = fs::read(&path)?;
    Ok(serde_json::from_slice(&contents)?)
}

/// Delete one record file.
pub fn delete_log(directory: &Path, filename: &str) -> Result<(), LogFileError> {
    let path = resolve_within(directory, filename)?;
    fs::remove_file(&path)?;
    tracing::info!(path = %path.display(), "Deleted log file");
    Ok(())
}

/// Map a client-supplied filename to an existing file directly inside
/// `directory`. Only the final path component is used; the canonical
/// result must still sit under the canonical directory (symlinks
/// pointing elsewhere are refused).
fn resolve_within(directory: &Path, filename: &str) -> Result<PathBuf, LogFileError> {
    let base_name = Path::new(filename)
        .file_name()
        .ok_or(LogFileError::NotFound)?;

    let root = directory.canonicalize().map_err(|_| LogFileError::NotFound)?;
    let candidate = root
        .join(base_name)
        .canonicalize()
        .map_err(|_| LogFileError::NotFound)?;

    if candidate.parent() != Some(root.as_path()) || !candidate.is_file() {
        return Err(LogFileError::NotFound);
    }
    Ok(candidate)
}
