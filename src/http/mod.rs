//! HTTP front door.
//!
//! # Data Flow
//! ```text
//! request
//!     → request.rs (request ID, tracing span)
//!     → security (CORS, body limit) + timeout
//!     → api.rs       /api, /api.php, /api/logs/{filename}
//!       catchall.rs  /catchall, /catchall/api.php
//!     → response.rs / error.rs (JSON rendering)
//! ```

pub mod api;
pub mod catchall;
pub mod error;
pub mod request;
pub mod response;
pub mod server;

pub use error::ApiError;
pub use request::X_REQUEST_ID;
pub use server::{build_router, AppState, HttpServer};
