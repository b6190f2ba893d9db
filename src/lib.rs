//! HTTP API tester.
//!
//! # Architecture Overview
//!
//! ```text
//!   dashboard / CLI                      third-party webhook sender
//!        │                                          │
//!        ▼                                          ▼
//!   ┌──────────┐   proxy    ┌────────────┐   ┌──────────────┐
//!   │ http/api │──────────▶ │   proxy    │   │ http/catchall│
//!   └────┬─────┘            │ guard+send │   └──────┬───────┘
//!        │ templates        └─────┬──────┘          │ capture
//!        ▼                        │                 ▼
//!   ┌──────────┐                  │        ┌────────────────┐
//!   │ storage  │◀─────────────────┼────────│ catcher        │
//!   │ templates│                  │        │ ring + resolver│
//!   │ ring     │                  ▼        └───────┬────────┘
//!   │ selection│             ┌─────────┐           │
//!   └──────────┘             │ records │◀──────────┘
//!                            │  logs/  │
//!                            └─────────┘
//! ```

pub mod catcher;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod records;
pub mod security;
pub mod storage;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
