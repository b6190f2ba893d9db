//! Named template store backed by `templates.json`.
//!
//! Request and response templates share one namespace. A stored payload
//! is classified by its `type` field when it is read back; anything
//! unrecognized is kept and returned as-is.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde_json::{Map, Value};

use crate::storage::json_file::{read_or_default, write_pretty};
use crate::storage::{StoreError, StoreResult};

pub const RESPONSE_TEMPLATE_TYPE: &str = "response_template";
pub const REQUEST_TEMPLATE_TYPE: &str = "request_template";

const DEFAULT_STATUS: u16 = 200;

/// A stored template, classified by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Template {
    /// A saved outbound call for the proxy form.
    Request(RequestTemplate),
    /// A canned reply for the webhook catcher.
    Response(ResponseTemplate),
    /// Anything else, passed through untouched.
    Opaque(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestTemplate {
    pub endpoint: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub payload: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseTemplate {
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    pub body: TemplateBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateBody {
    /// Sent as JSON when it parses as JSON, verbatim otherwise.
    Text(String),
    /// Always sent as pretty-printed JSON.
    Json(Value),
}

impl Template {
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Template::Opaque(value.clone());
        };

        match object.get("type").and_then(Value::as_str) {
            Some(RESPONSE_TEMPLATE_TYPE) => Template::Response(ResponseTemplate::from_object(object)),
            None | Some(REQUEST_TEMPLATE_TYPE) => match RequestTemplate::from_object(object) {
                Some(request) => Template::Request(request),
                None => Template::Opaque(value.clone()),
            },
            Some(_) => Template::Opaque(value.clone()),
        }
    }
}

impl RequestTemplate {
    fn from_object(object: &Map<String, Value>) -> Option<Self> {
        let endpoint = object.get("endpoint")?.as_str()?.to_string();
        let method = object
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("GET")
            .to_string();

        Some(Self {
            endpoint,
            method,
            headers: string_pairs(object.get("headers")).into_iter().collect(),
            payload: object.get("payload").filter(|v| !v.is_null()).cloned(),
        })
    }
}

impl ResponseTemplate {
    fn from_object(object: &Map<String, Value>) -> Self {
        let body = match object.get("body") {
            None | Some(Value::Null) => TemplateBody::Text(String::new()),
            Some(Value::String(s)) => TemplateBody::Text(s.clone()),
            Some(other) => TemplateBody::Json(other.clone()),
        };

        Self {
            status_code: object.get("status_code").map_or(DEFAULT_STATUS, parse_status),
            headers: string_pairs(object.get("headers")),
            body,
        }
    }
}

/// Lenient status parsing: numbers are truncated, strings use their
/// leading digits, anything outside 100..=999 becomes 200.
fn parse_status(value: &Value) -> u16 {
    let parsed = match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => {
            let digits: String = s.trim().chars().take_while(char::is_ascii_digit).collect();
            digits.parse::<u64>().ok()
        }
        _ => None,
    };

    parsed
        .filter(|code| (100..=999).contains(code))
        .and_then(|code| u16::try_from(code).ok())
        .unwrap_or(DEFAULT_STATUS)
}

/// Object entries whose values are scalars, stringified. Other shapes
/// are dropped.
fn string_pairs(value: Option<&Value>) -> Vec<(String, String)> {
    let Some(Value::Object(map)) = value else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(k, v)| {
            let v = match v {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((k.clone(), v))
        })
        .collect()
}

/// CRUD over `templates.json`.
#[derive(Debug)]
pub struct TemplateStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TemplateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an empty store file if none exists yet.
    pub fn ensure_exists(&self) -> StoreResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.path.exists() {
            return Ok(());
        }
        write_pretty(&self.path, &Map::new())
    }

    /// Every template as name → payload.
    pub fn list(&self) -> Map<String, Value> {
        read_or_default(&self.path)
    }

    pub fn get(&self, name: &str) -> Option<Template> {
        self.list().get(name).map(Template::from_value)
    }

    /// Insert or replace `name`.
    pub fn put(&self, name: &str, payload: Value) -> StoreResult<()> {
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut templates = self.list();
        templates.insert(name.to_string(), payload);
        write_pretty(&self.path, &templates)?;

        tracing::info!(template = %name, "Template saved");
        Ok(())
    }

    pub fn delete(&self, name: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut templates = self.list();
        if templates.shift_remove(name).is_none() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        write_pretty(&self.path, &templates)?;

        tracing::info!(template = %name, "Template deleted");
        Ok(())
    }
}
