//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Fallback base URL when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/";

/// Root configuration for the API tester.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Public base URL of this service, recorded in every log record.
    pub base_url: String,

    /// Where log records and state files live.
    pub storage: StorageConfig,

    /// Outbound proxy behaviour.
    pub proxy: ProxySettings,

    /// Server-side timeouts.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Request limits and CORS.
    pub security: SecurityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            storage: StorageConfig::default(),
            proxy: ProxySettings::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// File locations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one JSON file per logged exchange.
    pub log_directory: PathBuf,

    /// Directory holding `templates.json`, `requests.json` and
    /// `response_template.json`.
    pub data_directory: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            log_directory: PathBuf::from("logs"),
            data_directory: PathBuf::from("data"),
        }
    }
}

impl StorageConfig {
    pub fn templates_file(&self) -> PathBuf {
        self.data_directory.join("templates.json")
    }

    pub fn requests_file(&self) -> PathBuf {
        self.data_directory.join("requests.json")
    }

    pub fn selection_file(&self) -> PathBuf {
        self.data_directory.join("response_template.json")
    }
}

/// Outbound proxy settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Timeout applied when the caller does not send one, in milliseconds.
    pub default_timeout_ms: u64,

    /// Maximum redirect hops followed per call.
    pub max_redirects: usize,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            default_timeout_ms: 30_000,
            max_redirects: 10,
        }
    }
}

/// Timeout configuration for the front door.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request deadline in seconds. Must outlast the proxy timeout.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 120 }
    }
}

/// Output format for diagnostic logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Diagnostic log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Request limits and CORS.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
    /// Emit permissive CORS headers on every response.
    pub cors_enabled: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
            cors_enabled: true,
        }
    }
}
