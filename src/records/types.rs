//! On-disk shape of a logged exchange.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Which way the exchange went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// A call this service made on behalf of a client.
    Outbound,
    /// A webhook delivered to the catcher.
    Inbound,
}

/// One logged HTTP exchange. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Local time, `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
    #[serde(rename = "type")]
    pub direction: Direction,
    pub request: RecordedRequest,
    /// Present for outbound records only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<RecordedResponse>,
    pub server: ServerInfo,
}

/// Request half of a record; the field set depends on direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordedRequest {
    Outbound {
        method: String,
        endpoint: String,
        headers: BTreeMap<String, String>,
        payload: String,
    },
    Inbound {
        method: String,
        uri: String,
        query_string: String,
        headers: BTreeMap<String, String>,
        body: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedResponse {
    /// Upstream status, or 0 when the call never completed.
    pub status: u16,
    /// Raw header block as received.
    pub headers: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub base_url: String,
    pub client_identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}
