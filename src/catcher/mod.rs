//! Webhook catcher subsystem.
//!
//! # Data Flow
//! ```text
//! POST /catchall
//!     → capture.rs (snapshot method, headers, body, query, peer ip)
//!     → storage::RequestRingBuffer::append
//!     → records::LogWriter::log_inbound (best-effort)
//!     → resolver.rs (selected response template, or the default reply)
//!     → HTTP response
//! ```

pub mod capture;
pub mod resolver;

pub use capture::CapturedRequest;
pub use resolver::{default_reply, RenderedResponse, Resolution, ResponseResolver};
