//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → limits.rs (reject oversized bodies)
//!     → handlers
//! Outgoing response:
//!     → headers.rs (CORS headers, unless the handler set its own)
//! ```
//!
//! Egress restrictions for proxied calls live in `proxy::guard`.

pub mod headers;
pub mod limits;
