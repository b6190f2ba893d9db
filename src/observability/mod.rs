//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured diagnostic events via `tracing`)
//!     → metrics.rs (counters, gauges, histograms via `metrics`)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Diagnostic logs are separate from the exchange records in `records`
//! - Request ID (`x-request-id`) is attached to every request span
//! - Metrics calls are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
