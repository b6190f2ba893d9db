//! Template, log, and proxy endpoints (`/api`).

use std::collections::{BTreeMap, HashMap};

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};

use crate::http::error::ApiError;
use crate::http::request::run_blocking;
use crate::http::response::pretty_json;
use crate::http::server::AppState;
use crate::proxy::ProxyCall;
use crate::records;

type QueryParams = Query<HashMap<String, String>>;

/// `GET /api`: every template, or the log filenames with `?action=listLogs`.
pub async fn get(State(state): State<AppState>, Query(query): QueryParams) -> Result<Response, ApiError> {
    let list_logs = query.get("action").map(String::as_str) == Some("listLogs");

    run_blocking(move || {
        if list_logs {
            let names = records::list_logs(state.log_writer.directory()).map_err(|e| {
                tracing::error!(error = %e, "Failed to list log directory");
                ApiError::Internal("Failed to list log files.".into())
            })?;
            return Ok(Json(names).into_response());
        }

        Ok(pretty_json(StatusCode::OK, &state.templates.list()))
    })
    .await
}

/// `GET /api/logs/{filename}`: one stored record.
pub async fn show_log(State(state): State<AppState>, Path(filename): Path<String>) -> Result<Response, ApiError> {
    run_blocking(move || {
        let record = records::read_log(state.log_writer.directory(), &filename)?;
        Ok(pretty_json(StatusCode::OK, &record))
    })
    .await
}

/// `POST /api`: proxy a call, or create/replace a template.
pub async fn post(
    State(state): State<AppState>,
    Query(query): QueryParams,
    body: Bytes,
) -> Result<Response, ApiError> {
    let data: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON in request body: {}", e)))?;

    if data.get("action").and_then(Value::as_str) == Some("proxy") {
        let call = proxy_call_from(&data, query.get("id").cloned());
        let outcome = state.proxy.execute(call).await?;

        let status = StatusCode::from_u16(outcome.status).unwrap_or(StatusCode::BAD_GATEWAY);
        let body = json!({
            "status": outcome.status,
            "headers": outcome.headers,
            "body": outcome.body,
        });
        return Ok((status, Json(body)).into_response());
    }

    if let Value::Object(mut fields) = data {
        if let Some(Value::String(name)) = fields.shift_remove("name") {
            return run_blocking(move || {
                state.templates.put(&name, Value::Object(fields))?;
                Ok(Json(json!({ "message": "Template added successfully." })).into_response())
            })
            .await;
        }
    }

    Err(ApiError::BadRequest("Template name not provided or invalid request.".into()))
}

/// `DELETE /api`: remove a log file (`filename`) or a template (`name`).
pub async fn delete(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let data: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    let text = |key: &str| data.get(key).and_then(Value::as_str).map(str::to_string);
    let (filename, name) = (text("filename"), text("name"));

    run_blocking(move || {
        if let Some(filename) = filename {
            records::delete_log(state.log_writer.directory(), &filename)?;
            return Ok(Json(json!({ "message": "Log file deleted successfully." })).into_response());
        }

        if let Some(name) = name {
            state.templates.delete(&name)?;
            return Ok(Json(json!({ "message": "Template deleted successfully." })).into_response());
        }

        Err(ApiError::BadRequest("Filename or template name not provided.".into()))
    })
    .await
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Read the proxy fields leniently: scalars are stringified, a non-string
/// payload is sent as its JSON text.
fn proxy_call_from(data: &Value, query_id: Option<String>) -> ProxyCall {
    let text = |key: &str| data.get(key).and_then(Value::as_str).map(str::to_string);

    let headers: BTreeMap<String, String> = data
        .get("headers")
        .and_then(Value::as_object)
        .map(stringify_scalars)
        .unwrap_or_default();

    let payload = match data.get("payload") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    let timeout_ms = match data.get("timeout") {
        Some(Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };

    ProxyCall {
        endpoint: text("endpoint"),
        method: text("method"),
        headers,
        payload,
        timeout_ms,
        log_identifier: text("logIdentifier"),
        query_id,
    }
}

fn stringify_scalars(map: &Map<String, Value>) -> BTreeMap<String, String> {
    map.iter()
        .filter_map(|(k, v)| match v {
            Value::String(s) => Some((k.clone(), s.clone())),
            Value::Number(_) | Value::Bool(_) => Some((k.clone(), v.to_string())),
            _ => None,
        })
        .collect()
}
