//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::AppConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("base_url '{0}' must be an absolute http(s) URL")]
    BaseUrl(String),

    #[error("storage.{0} must not be empty")]
    EmptyDirectory(&'static str),

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("timeouts.request_secs ({request_secs}s) must exceed proxy.default_timeout_ms ({proxy_ms}ms)")]
    DeadlineTooShort { request_secs: u64, proxy_ms: u64 },

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    match Url::parse(&config.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
        _ => errors.push(ValidationError::BaseUrl(config.base_url.clone())),
    }

    if config.storage.log_directory.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyDirectory("log_directory"));
    }
    if config.storage.data_directory.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyDirectory("data_directory"));
    }

    if config.proxy.default_timeout_ms == 0 {
        errors.push(ValidationError::ZeroValue("proxy.default_timeout_ms"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.request_secs"));
    } else if config.timeouts.request_secs.saturating_mul(1000) <= config.proxy.default_timeout_ms {
        errors.push(ValidationError::DeadlineTooShort {
            request_secs: config.timeouts.request_secs,
            proxy_ms: config.proxy.default_timeout_ms,
        });
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::ZeroValue("security.max_body_size"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&AppConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "nope".into();
        config.base_url = "ftp://files.example.com/".into();
        config.storage.log_directory = PathBuf::new();
        config.timeouts.request_secs = 10;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::BindAddress("nope".into())));
        assert!(errors.contains(&ValidationError::EmptyDirectory("log_directory")));
        assert!(errors.contains(&ValidationError::DeadlineTooShort {
            request_secs: 10,
            proxy_ms: 30_000
        }));
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = AppConfig::default();
        config.observability.metrics_address = "garbage".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::MetricsAddress("garbage".into())])
        );
    }
}
