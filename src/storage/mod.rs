//! File-backed state shared across requests.
//!
//! # Data Flow
//! ```text
//! catcher handler ──▶ ring_buffer.rs ──▶ requests.json
//!                 ──▶ selection.rs   ──▶ response_template.json
//! api handler     ──▶ templates.rs   ──▶ templates.json
//! ```
//!
//! # Design Decisions
//! - Nothing is cached in memory; every call reads the file
//! - Missing or corrupt files read as empty state
//! - Each store serializes its own read-modify-write cycles with a
//!   mutex, so writers inside one process never lose updates. Separate
//!   processes sharing the files are still last-write-wins.
//! - Files are written to a sibling temp file and renamed into place

pub mod json_file;
pub mod ring_buffer;
pub mod selection;
pub mod templates;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use ring_buffer::{RequestRingBuffer, RING_CAPACITY};
pub use selection::SelectionStore;
pub use templates::{RequestTemplate, ResponseTemplate, Template, TemplateBody, TemplateStore};

/// Errors surfaced by the stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("template name must be a non-empty string")]
    EmptyName,

    #[error("template '{0}' not found")]
    NotFound(String),

    #[error("failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

pub type StoreResult<T> = Result<T, StoreError>;
