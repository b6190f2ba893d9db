//! Startup orchestration.
//!
//! Fail fast: a directory that cannot be created or a template file that
//! cannot be seeded stops the server before it binds.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::config::AppConfig;
use crate::http::AppState;
use crate::proxy::{ReqwestTransport, SystemResolver, TransportError};
use crate::storage::{StoreError, TemplateStore};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to create directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to seed template store: {0}")]
    Templates(#[from] StoreError),

    #[error("failed to build outbound HTTP client: {0}")]
    Transport(#[from] TransportError),
}

/// Create the storage directories and build state backed by the real network.
pub fn prepare(config: AppConfig) -> Result<AppState, StartupError> {
    for dir in [&config.storage.data_directory, &config.storage.log_directory] {
        std::fs::create_dir_all(dir).map_err(|source| StartupError::Directory {
            path: dir.clone(),
            source,
        })?;
    }

    TemplateStore::new(config.storage.templates_file()).ensure_exists()?;

    let transport = ReqwestTransport::new(config.proxy.max_redirects)?;
    tracing::info!(
        data_directory = %config.storage.data_directory.display(),
        log_directory = %config.storage.log_directory.display(),
        "Storage ready"
    );

    Ok(AppState::new(config, Arc::new(transport), Arc::new(SystemResolver)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prepare_creates_directories() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.storage.log_directory = dir.path().join("logs");
        config.storage.data_directory = dir.path().join("nested/data");

        let state = prepare(config).unwrap();

        assert!(dir.path().join("logs").is_dir());
        assert!(state.templates.path().exists());
        assert!(state.templates.list().is_empty());
    }

    #[test]
    fn test_prepare_fails_on_file_in_the_way() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("blocked"), "").unwrap();

        let mut config = AppConfig::default();
        config.storage.data_directory = dir.path().join("blocked");
        config.storage.log_directory = dir.path().join("logs");

        assert!(matches!(prepare(config), Err(StartupError::Directory { .. })));
    }
}
