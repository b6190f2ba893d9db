//! Request body limits.
//!
//! Two layers: tower-http's `RequestBodyLimitLayer` rejects bodies whose
//! declared or streamed size exceeds the limit with 413, and axum's
//! `DefaultBodyLimit` keeps extractors consistent with it.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

pub fn with_body_limit(router: Router, max_body_size: usize) -> Router {
    router
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(RequestBodyLimitLayer::new(max_body_size))
}
