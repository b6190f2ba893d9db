//! Webhook catcher (`/catchall`).
//!
//! Control actions arrive as JSON bodies with an `action` field; every
//! other POST is captured, logged, and answered by the response resolver.

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::catcher::{CapturedRequest, Resolution, ResponseResolver};
use crate::http::error::ApiError;
use crate::http::request::{peer_ip, read_body, run_blocking};
use crate::http::response::{pretty_json, rendered};
use crate::http::server::AppState;
use crate::observability::metrics;

/// Control messages understood by the catcher.
#[derive(Debug, PartialEq)]
enum Control {
    GetRequests,
    SetResponseTemplate(Option<String>),
    Clear,
}

impl Control {
    fn from_body(parsed: Option<&Value>) -> Option<Self> {
        let parsed = parsed?;
        match parsed.get("action")?.as_str()? {
            "get_requests" => Some(Control::GetRequests),
            "clear" => Some(Control::Clear),
            "set_response_template" => {
                let name = parsed
                    .get("template_name")
                    .and_then(Value::as_str)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string);
                Some(Control::SetResponseTemplate(name))
            }
            _ => None,
        }
    }
}

pub async fn handle(State(state): State<AppState>, request: Request<Body>) -> Result<Response, ApiError> {
    let peer = peer_ip(&request);
    let (parts, body) = request.into_parts();
    let body = read_body(body, state.config.security.max_body_size).await?;

    let capture = CapturedRequest::from_parts(&parts.method, &parts.headers, parts.uri.query(), &body, peer);

    let uri = parts.uri.to_string();
    run_blocking(move || dispatch(&state, capture, &uri)).await
}

fn dispatch(state: &AppState, capture: CapturedRequest, uri: &str) -> Result<Response, ApiError> {
    match Control::from_body(capture.parsed_body.as_ref()) {
        Some(Control::GetRequests) => {
            let requests = state.requests.list();
            Ok(pretty_json(
                StatusCode::OK,
                &json!({
                    "status": "success",
                    "total_requests": requests.len(),
                    "requests": requests,
                }),
            ))
        }
        Some(Control::SetResponseTemplate(name)) => {
            state.selection.set(name.as_deref())?;
            tracing::info!(template = ?name, "Catcher response template selected");
            Ok(Json(json!({ "status": "success", "message": "Response template updated" })).into_response())
        }
        Some(Control::Clear) => clear(state),
        // Legacy `?clear` only applies when the body carries no action
        None if capture.query.contains_key("clear") => clear(state),
        None => capture_and_reply(state, capture, uri),
    }
}

fn clear(state: &AppState) -> Result<Response, ApiError> {
    state.requests.clear()?;
    tracing::info!("Captured requests cleared");
    Ok(Json(json!({ "status": "success", "message": "Data cleared" })).into_response())
}

fn capture_and_reply(state: &AppState, capture: CapturedRequest, uri: &str) -> Result<Response, ApiError> {
    let snapshot = state.requests.append(capture)?;
    metrics::record_capture(snapshot.len());

    if let Some(latest) = snapshot.first() {
        if let Err(e) = state.log_writer.log_inbound(latest, uri) {
            metrics::record_log_write_failure("inbound");
            tracing::warn!(error = %e, "Failed to write inbound log record");
        }
    }

    let resolution = ResponseResolver::new(&state.selection, &state.templates).resolve(&snapshot);
    match &resolution {
        Resolution::Template { name, .. } => {
            metrics::record_catcher_reply("template");
            tracing::debug!(template = %name, "Replying with response template");
        }
        Resolution::Default(_) => metrics::record_catcher_reply("default"),
    }

    Ok(rendered(resolution.into_response()))
}

pub async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "status": "error", "message": "Only POST requests are allowed" })),
    )
        .into_response()
}
