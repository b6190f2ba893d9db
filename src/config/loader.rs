//! Configuration loading from disk and environment.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{AppConfig, DEFAULT_BASE_URL};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment
/// overrides, and validate the result.
pub fn load(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_file(path)?,
        None => AppConfig::default(),
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn load_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply `BASE_URL`, `LOG_DIRECTORY`, `DATA_DIRECTORY` and `BIND_ADDRESS`.
///
/// Takes a lookup function so tests don't have to touch the process env.
pub fn apply_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = non_empty("BASE_URL") {
        config.base_url = url;
    }
    if let Some(dir) = non_empty("LOG_DIRECTORY") {
        config.storage.log_directory = PathBuf::from(dir);
    }
    if let Some(dir) = non_empty("DATA_DIRECTORY") {
        config.storage.data_directory = PathBuf::from(dir);
    }
    if let Some(addr) = non_empty("BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }

    config.base_url = normalize_base_url(&config.base_url);
}

/// Exactly one trailing slash; blank falls back to the default.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return DEFAULT_BASE_URL.to_string();
    }
    format!("{}/", trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_base_url_normalization() {
        assert_eq!(normalize_base_url("http://example.com"), "http://example.com/");
        assert_eq!(normalize_base_url("http://example.com///"), "http://example.com/");
        assert_eq!(normalize_base_url("  "), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_env_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("BASE_URL", "https://hooks.example.com"),
            ("LOG_DIRECTORY", "/var/log/api-tester"),
            ("BIND_ADDRESS", ""),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        apply_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.base_url, "https://hooks.example.com/");
        assert_eq!(config.storage.log_directory, PathBuf::from("/var/log/api-tester"));
        // Empty values are ignored
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn test_load_file_with_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
base_url = "http://tester.local:9000"

[listener]
bind_address = "127.0.0.1:9000"

[proxy]
default_timeout_ms = 5000
"#
        )
        .unwrap();

        let config = load_file(file.path()).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.proxy.default_timeout_ms, 5000);
        assert_eq!(config.proxy.max_redirects, 10);
        assert_eq!(config.storage.data_directory, PathBuf::from("data"));
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "listener = 5").unwrap();
        assert!(matches!(load_file(file.path()), Err(ConfigError::Parse(_))));
    }
}
