//! Outbound proxy subsystem.
//!
//! # Data Flow
//! ```text
//! POST /api {"action":"proxy", ...}
//!     → executor.rs (validate input, in order)
//!     → guard.rs (literal host check, then DNS resolution check)
//!     → transport.rs (reqwest call; every redirect hop and every DNS
//!       lookup re-checked by the same guard)
//!     → records::LogWriter::log_outbound (best-effort, success or failure)
//!     → {status, headers, body} back to the caller
//! ```
//!
//! # Design Decisions
//! - Validation failures never touch the network
//! - Transport and resolver are traits so the executor can run against
//!   in-memory fakes
//! - Response headers are returned as the raw header block

pub mod executor;
pub mod guard;
pub mod transport;

pub use executor::{ProxyCall, ProxyError, ProxyExecutor, ProxyOutcome};
pub use guard::{HostResolver, SystemResolver};
pub use transport::{OutboundRequest, ReqwestTransport, Transport, TransportError, UpstreamResponse};
