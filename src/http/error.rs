//! Client-facing error taxonomy.
//!
//! Every error renders as a JSON object with an `error` field. Internal
//! details are logged where the error is produced and never rendered.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::proxy::ProxyError;
use crate::records::LogFileError;
use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Method not allowed.")]
    MethodNotAllowed,

    /// The proxied call failed in transit. Rendered with `"status": 0`.
    #[error("Request failed: {0}")]
    UpstreamFailure(String),

    /// Public message only; details were already logged.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::UpstreamFailure(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            ApiError::UpstreamFailure(_) => json!({ "error": self.to_string(), "status": 0 }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::InternalNetwork => ApiError::Forbidden(err.to_string()),
            ProxyError::Upstream(message) => ApiError::UpstreamFailure(message),
            ProxyError::MissingFields | ProxyError::InvalidUrl | ProxyError::MissingHost => {
                ApiError::BadRequest(err.to_string())
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmptyName => ApiError::BadRequest("Template name not provided or invalid request.".into()),
            StoreError::NotFound(_) => ApiError::NotFound("Template not found.".into()),
            StoreError::Serialize { .. } | StoreError::Write { .. } => {
                tracing::error!(error = %err, "State file write failed");
                ApiError::Internal("Failed to save data. Check file permissions.".into())
            }
        }
    }
}

impl From<LogFileError> for ApiError {
    fn from(err: LogFileError) -> Self {
        match err {
            LogFileError::NotFound => ApiError::NotFound("Log file not found.".into()),
            LogFileError::Corrupt(_) | LogFileError::Io(_) => {
                tracing::error!(error = %err, "Log file operation failed");
                ApiError::Internal("Log file operation failed.".into())
            }
        }
    }
}
