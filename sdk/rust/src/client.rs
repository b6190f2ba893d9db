use std::collections::BTreeMap;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::SdkError;

/// An outbound call for the server to make on our behalf.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    pub endpoint: String,
    pub method: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Sent verbatim when a string, as JSON text otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_identifier: Option<String>,
}

/// The upstream reply, relayed as-is.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProxyResponse {
    pub status: u16,
    /// Raw header block, status line included.
    pub headers: String,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaughtRequests {
    pub requests: Vec<Value>,
    pub total_requests: usize,
}

/// What the catcher answered to a webhook.
#[derive(Debug, Clone)]
pub struct WebhookReply {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

pub struct ApiTesterClient {
    client: Client,
    base_url: String,
}

impl ApiTesterClient {
    /// `base_url` is the server root, e.g. `http://localhost:8080`.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn list_templates(&self) -> Result<Map<String, Value>, SdkError> {
        let resp = self.client.get(self.url("/api")).send().await?;
        decode(resp).await
    }

    /// Create or replace a template. `payload` must be a JSON object.
    pub async fn put_template(&self, name: &str, payload: &Value) -> Result<String, SdkError> {
        let mut body = match payload {
            Value::Object(fields) => fields.clone(),
            other => {
                let mut fields = Map::new();
                fields.insert("payload".to_string(), other.clone());
                fields
            }
        };
        body.insert("name".to_string(), Value::String(name.to_string()));

        let resp = self.client.post(self.url("/api")).json(&body).send().await?;
        message(resp).await
    }

    pub async fn delete_template(&self, name: &str) -> Result<String, SdkError> {
        let resp = self
            .client
            .delete(self.url("/api"))
            .json(&json!({ "name": name }))
            .send()
            .await?;
        message(resp).await
    }

    pub async fn list_logs(&self) -> Result<Vec<String>, SdkError> {
        let resp = self
            .client
            .get(self.url("/api"))
            .query(&[("action", "listLogs")])
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn get_log(&self, filename: &str) -> Result<Value, SdkError> {
        let resp = self
            .client
            .get(self.url(&format!("/api/logs/{}", filename)))
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn delete_log(&self, filename: &str) -> Result<String, SdkError> {
        let resp = self
            .client
            .delete(self.url("/api"))
            .json(&json!({ "filename": filename }))
            .send()
            .await?;
        message(resp).await
    }

    /// Have the server perform `request`. `query_id` becomes the log
    /// identifier when the request carries none.
    ///
    /// An upstream error status is not an `Err`; only failures of the
    /// server itself are.
    pub async fn proxy(&self, request: &ProxyRequest, query_id: Option<&str>) -> Result<ProxyResponse, SdkError> {
        let mut body = serde_json::to_value(request)?;
        if let Value::Object(fields) = &mut body {
            fields.insert("action".to_string(), Value::String("proxy".to_string()));
        }

        let mut builder = self.client.post(self.url("/api")).json(&body);
        if let Some(id) = query_id {
            builder = builder.query(&[("id", id)]);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let text = resp.text().await?;

        match serde_json::from_str::<ProxyResponse>(&text) {
            Ok(relayed) if relayed.status == status => Ok(relayed),
            _ => Err(api_error(status, &text)),
        }
    }

    pub async fn requests(&self) -> Result<CaughtRequests, SdkError> {
        let resp = self
            .client
            .post(self.url("/catchall"))
            .json(&json!({ "action": "get_requests" }))
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn clear_requests(&self) -> Result<String, SdkError> {
        let resp = self
            .client
            .post(self.url("/catchall"))
            .json(&json!({ "action": "clear" }))
            .send()
            .await?;
        message(resp).await
    }

    /// Select the catcher's response template, or go back to the default reply.
    pub async fn select_template(&self, name: Option<&str>) -> Result<String, SdkError> {
        let resp = self
            .client
            .post(self.url("/catchall"))
            .json(&json!({ "action": "set_response_template", "template_name": name }))
            .send()
            .await?;
        message(resp).await
    }

    /// Deliver a webhook to the catcher the way a third party would.
    pub async fn send_webhook(&self, body: &Value, id: Option<&str>) -> Result<WebhookReply, SdkError> {
        let mut builder = self.client.post(self.url("/catchall")).json(body);
        if let Some(id) = id {
            builder = builder.query(&[("id", id)]);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().await?;

        Ok(WebhookReply { status, content_type, body })
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, SdkError> {
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        return Err(api_error(status.as_u16(), &text));
    }
    Ok(serde_json::from_str(&text)?)
}

/// The `message` field of a success reply.
async fn message(resp: Response) -> Result<String, SdkError> {
    let value: Value = decode(resp).await?;
    Ok(value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string())
}

/// Server errors carry `error`; catcher errors carry `message`.
fn api_error(status: u16, text: &str) -> SdkError {
    let message = serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| text.to_string());
    SdkError::Api { status, message }
}
