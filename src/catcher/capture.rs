//! Snapshot of one inbound webhook call.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::net::IpAddr;

use axum::http::{HeaderMap, Method};
use chrono::Local;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::records::writer::format_timestamp;

/// An inbound call as stored in the ring buffer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapturedRequest {
    #[serde(deserialize_with = "lenient_string")]
    pub method: String,
    /// Older buffers store an empty map as `[]`.
    #[serde(deserialize_with = "lenient_map")]
    pub headers: BTreeMap<String, String>,
    /// Body decoded as UTF-8 (lossy).
    #[serde(deserialize_with = "lenient_string")]
    pub body: String,
    #[serde(deserialize_with = "lenient_map")]
    pub query: BTreeMap<String, String>,
    #[serde(deserialize_with = "lenient_string")]
    pub timestamp: String,
    #[serde(deserialize_with = "lenient_string")]
    pub ip: String,
    /// The body parsed as JSON, `null` when it isn't JSON.
    pub parsed_body: Option<Value>,
}

impl CapturedRequest {
    pub fn from_parts(
        method: &Method,
        headers: &HeaderMap,
        raw_query: Option<&str>,
        body: &[u8],
        peer: Option<IpAddr>,
    ) -> Self {
        Self {
            method: method.as_str().to_string(),
            headers: header_map(headers),
            body: String::from_utf8_lossy(body).into_owned(),
            query: parse_query(raw_query),
            timestamp: format_timestamp(&Local::now()),
            ip: peer.map_or_else(|| "unknown".to_string(), |ip| ip.to_string()),
            parsed_body: serde_json::from_slice(body).ok(),
        }
    }
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

/// Objects keep their scalar entries; any other shape is an empty map.
fn lenient_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Object(map) = Value::deserialize(deserializer)? else {
        return Ok(BTreeMap::new());
    };
    Ok(map
        .into_iter()
        .filter_map(|(k, v)| scalar_text(v).map(|v| (k, v)))
        .collect())
}

/// Query string as a map; later duplicates win.
pub fn parse_query(raw_query: Option<&str>) -> BTreeMap<String, String> {
    raw_query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Header names → values, repeated headers joined with `", "`.
fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        match map.entry(name.as_str().to_string()) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                existing.push_str(", ");
                existing.push_str(&value);
            }
            Entry::Vacant(entry) => {
                entry.insert(value.into_owned());
            }
        }
    }
    map
}
