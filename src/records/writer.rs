//! Best-effort writer for exchange records.
//!
//! Filenames follow `{identifier}_{YYYY-MM-DD}_{HH-MM-SS}_{token}.json`
//! where `token` is the last 12 hex digits of a process-wide strictly
//! increasing microsecond counter, so two records written in the same
//! second never share a name.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::catcher::CapturedRequest;
use crate::config::AppConfig;
use crate::records::identifier::{inbound_identifier, outbound_identifier};
use crate::records::types::{Direction, LogRecord, RecordedRequest, RecordedResponse, ServerInfo};

const TOKEN_LEN: usize = 12;

static LAST_TOKEN: AtomicU64 = AtomicU64::new(0);

/// Errors from writing a record. Callers log and discard these.
#[derive(Debug, Error)]
pub enum LogWriteError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDirectory { path: PathBuf, source: io::Error },

    #[error("failed to serialize log record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write log file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Everything known about one outbound call.
#[derive(Debug, Clone, Copy)]
pub struct OutboundExchange<'a> {
    pub endpoint: &'a str,
    pub method: &'a str,
    pub headers: &'a BTreeMap<String, String>,
    pub payload: &'a str,
    pub status: u16,
    pub response_headers: &'a str,
    pub response_body: &'a str,
}

/// Writes one JSON file per exchange into the log directory.
#[derive(Debug, Clone)]
pub struct LogWriter {
    directory: PathBuf,
    base_url: String,
}

impl LogWriter {
    pub fn new(directory: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.storage.log_directory.clone(), config.base_url.clone())
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Record an outbound call. `query_id` is the `id` query parameter of
    /// the request that asked for the call, if any.
    pub fn log_outbound(
        &self,
        exchange: &OutboundExchange<'_>,
        custom_identifier: Option<&str>,
        query_id: Option<&str>,
    ) -> Result<PathBuf, LogWriteError> {
        let identifier = outbound_identifier(custom_identifier, query_id, exchange.endpoint);
        let now = Local::now();

        let record = LogRecord {
            timestamp: format_timestamp(&now),
            direction: Direction::Outbound,
            request: RecordedRequest::Outbound {
                method: exchange.method.to_string(),
                endpoint: exchange.endpoint.to_string(),
                headers: exchange.headers.clone(),
                payload: exchange.payload.to_string(),
            },
            response: Some(RecordedResponse {
                status: exchange.status,
                headers: exchange.response_headers.to_string(),
                body: exchange.response_body.to_string(),
            }),
            server: ServerInfo {
                base_url: self.base_url.clone(),
                client_identifier: identifier.clone(),
                ip: None,
            },
        };

        self.write(&identifier, &now, &record)
    }

    /// Record a webhook delivered to the catcher. `uri` is the request
    /// path and query as received.
    pub fn log_inbound(&self, capture: &CapturedRequest, uri: &str) -> Result<PathBuf, LogWriteError> {
        let identifier = inbound_identifier(capture.query.get("id").map(String::as_str));
        let now = Local::now();

        let query_string = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(capture.query.iter())
            .finish();

        let record = LogRecord {
            timestamp: format_timestamp(&now),
            direction: Direction::Inbound,
            request: RecordedRequest::Inbound {
                method: capture.method.clone(),
                uri: uri.to_string(),
                query_string,
                headers: capture.headers.clone(),
                body: capture.body.clone(),
            },
            response: None,
            server: ServerInfo {
                base_url: self.base_url.clone(),
                client_identifier: identifier.clone(),
                ip: Some(if capture.ip.is_empty() {
                    "unknown".to_string()
                } else {
                    capture.ip.clone()
                }),
            },
        };

        self.write(&identifier, &now, &record)
    }

    fn write(&self, identifier: &str, now: &DateTime<Local>, record: &LogRecord) -> Result<PathBuf, LogWriteError> {
        self.ensure_directory()?;

        let contents = serde_json::to_vec_pretty(record)?;
        let path = self.directory.join(log_filename(identifier, now, &next_unique_token(now)));

        // create_new: an existing file is never overwritten
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| LogWriteError::Write { path: path.clone(), source })?;
        file.write_all(&contents)
            .map_err(|source| LogWriteError::Write { path: path.clone(), source })?;

        tracing::debug!(path = %path.display(), "Wrote log record");
        Ok(path)
    }

    fn ensure_directory(&self) -> Result<(), LogWriteError> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o755);
        }
        builder
            .create(&self.directory)
            .map_err(|source| LogWriteError::CreateDirectory {
                path: self.directory.clone(),
                source,
            })
    }
}

/// `YYYY-MM-DD HH:MM:SS` in local time.
pub fn format_timestamp(now: &DateTime<Local>) -> String {
    now.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn log_filename(identifier: &str, now: &DateTime<Local>, token: &str) -> String {
    format!(
        "{}_{}_{}_{}.json",
        identifier,
        now.format("%Y-%m-%d"),
        now.format("%H-%M-%S"),
        token
    )
}

/// Hex microsecond timestamp, bumped so it strictly increases per process.
fn next_unique_token(now: &DateTime<Local>) -> String {
    let micros = u64::try_from(now.timestamp_micros()).unwrap_or_default();
    let mut previous = LAST_TOKEN.load(Ordering::Relaxed);
    let value = loop {
        let candidate = micros.max(previous + 1);
        match LAST_TOKEN.compare_exchange_weak(previous, candidate, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => break candidate,
            Err(actual) => previous = actual,
        }
    };

    let hex = format!("{:013x}", value);
    hex[hex.len() - TOKEN_LEN..].to_string()
}
