//! Exchange records subsystem.
//!
//! # Data Flow
//! ```text
//! inbound capture / outbound proxy result
//!     → identifier.rs (pick and sanitize the client identifier)
//!     → writer.rs (build LogRecord, pick unique filename, write JSON)
//!     → <log_directory>/{identifier}_{date}_{time}_{token}.json
//!
//! Dashboards:
//!     → directory.rs (list, read, delete record files)
//! ```
//!
//! # Design Decisions
//! - One file per exchange; files are never rewritten
//! - Writing is best-effort: callers get a `Result` and decide to
//!   log-and-ignore it, the primary request never fails because of it
//! - Directory operations refuse anything outside the log directory

pub mod directory;
pub mod identifier;
pub mod types;
pub mod writer;

pub use directory::{delete_log, list_logs, read_log, LogFileError};
pub use identifier::sanitize_identifier;
pub use types::{Direction, LogRecord, RecordedRequest, RecordedResponse, ServerInfo};
pub use writer::{LogWriteError, LogWriter, OutboundExchange};
