//! Decides what the catcher sends back.
//!
//! ```text
//! no selection ─────────────────────────────┐
//! selection → template missing ─────────────┼──▶ default reply (200)
//! selection → template not a response one ──┘
//! selection → response template ───────────────▶ templated reply
//! ```
//!
//! A dangling selection is not an error; it is ignored.

use serde_json::{json, Value};

use crate::catcher::CapturedRequest;
use crate::storage::{ResponseTemplate, SelectionStore, Template, TemplateBody, TemplateStore};

/// A fully decided HTTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResponse {
    pub status: u16,
    /// Extra headers in template order. Later entries replace earlier
    /// ones with the same name.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Default(RenderedResponse),
    Template {
        name: String,
        response: RenderedResponse,
    },
}

impl Resolution {
    pub fn response(&self) -> &RenderedResponse {
        match self {
            Resolution::Default(response) => response,
            Resolution::Template { response, .. } => response,
        }
    }

    pub fn into_response(self) -> RenderedResponse {
        match self {
            Resolution::Default(response) => response,
            Resolution::Template { response, .. } => response,
        }
    }
}

/// Reads the current selection and template on every call.
pub struct ResponseResolver<'a> {
    selection: &'a SelectionStore,
    templates: &'a TemplateStore,
}

impl<'a> ResponseResolver<'a> {
    pub fn new(selection: &'a SelectionStore, templates: &'a TemplateStore) -> Self {
        Self { selection, templates }
    }

    /// `requests` is the ring buffer snapshot used by the default reply.
    pub fn resolve(&self, requests: &[CapturedRequest]) -> Resolution {
        let Some(name) = self.selection.get() else {
            return Resolution::Default(default_reply(requests));
        };

        match self.templates.get(&name) {
            Some(Template::Response(template)) => Resolution::Template {
                response: render_template(&template),
                name,
            },
            Some(_) => {
                tracing::debug!(template = %name, "Selected template is not a response template, using default reply");
                Resolution::Default(default_reply(requests))
            }
            None => {
                tracing::debug!(template = %name, "Selected template no longer exists, using default reply");
                Resolution::Default(default_reply(requests))
            }
        }
    }
}

/// `{status, message, requests, total_requests}` with HTTP 200.
pub fn default_reply(requests: &[CapturedRequest]) -> RenderedResponse {
    let body = json!({
        "status": "success",
        "message": "Data received",
        "requests": requests,
        "total_requests": requests.len(),
    });

    RenderedResponse {
        status: 200,
        headers: Vec::new(),
        body: pretty(&body),
    }
}

pub fn render_template(template: &ResponseTemplate) -> RenderedResponse {
    let body = match &template.body {
        TemplateBody::Text(text) => match serde_json::from_str::<Value>(text) {
            Ok(parsed) => pretty(&parsed),
            Err(_) => text.clone(),
        },
        TemplateBody::Json(value) => pretty(value),
    };

    RenderedResponse {
        status: template.status_code,
        headers: template.headers.clone(),
        body,
    }
}

fn pretty(value: &Value) -> String {
    // Serializing a Value cannot fail
    serde_json::to_string_pretty(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        selection: SelectionStore,
        templates: TemplateStore,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            Self {
                selection: SelectionStore::new(dir.path().join("response_template.json")),
                templates: TemplateStore::new(dir.path().join("templates.json")),
                _dir: dir,
            }
        }

        fn resolve(&self, requests: &[CapturedRequest]) -> Resolution {
            ResponseResolver::new(&self.selection, &self.templates).resolve(requests)
        }
    }

    fn snapshot() -> Vec<CapturedRequest> {
        vec![CapturedRequest {
            method: "POST".into(),
            body: "x".into(),
            ..Default::default()
        }]
    }

    #[test]
    fn test_no_selection_gives_default_reply() {
        let f = Fixture::new();
        let resolution = f.resolve(&snapshot());

        let Resolution::Default(response) = resolution else {
            panic!("expected default reply");
        };
        assert_eq!(response.status, 200);
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "Data received");
        assert_eq!(body["total_requests"], 1);
        assert_eq!(body["requests"][0]["body"], "x");
    }

    #[test]
    fn test_non_response_template_matches_default() {
        let f = Fixture::new();
        let requests = snapshot();
        let unselected = f.resolve(&requests);

        f.templates
            .put("req", json!({"endpoint": "https://example.com", "status_code": 500, "body": "nope"}))
            .unwrap();
        f.selection.set(Some("req")).unwrap();
        assert_eq!(f.resolve(&requests), unselected);

        f.selection.set(Some("deleted-long-ago")).unwrap();
        assert_eq!(f.resolve(&requests), unselected);
    }

    #[test]
    fn test_json_string_body_is_pretty_printed() {
        let f = Fixture::new();
        f.templates
            .put("ok", json!({"type": "response_template", "body": "{\"a\":1}"}))
            .unwrap();
        f.selection.set(Some("ok")).unwrap();

        let resolution = f.resolve(&[]);
        assert!(matches!(resolution, Resolution::Template { ref name, .. } if name == "ok"));
        let response = resolution.into_response();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_plain_text_body_is_verbatim() {
        let f = Fixture::new();
        f.templates
            .put(
                "txt",
                json!({
                    "type": "response_template",
                    "status_code": 418,
                    "headers": {"Content-Type": "text/plain", "X-Brew": "tea"},
                    "body": "I'm a teapot {"
                }),
            )
            .unwrap();
        f.selection.set(Some("txt")).unwrap();

        let response = f.resolve(&snapshot()).into_response();
        assert_eq!(response.status, 418);
        assert_eq!(response.body, "I'm a teapot {");
        assert_eq!(
            response.headers,
            vec![
                ("Content-Type".to_string(), "text/plain".to_string()),
                ("X-Brew".to_string(), "tea".to_string())
            ]
        );
    }

    #[test]
    fn test_structured_and_missing_bodies() {
        let structured = render_template(&ResponseTemplate {
            status_code: 202,
            headers: Vec::new(),
            body: TemplateBody::Json(json!([1, 2])),
        });
        assert_eq!(structured.body, "[\n  1,\n  2\n]");

        let Template::Response(empty) = Template::from_value(&json!({"type": "response_template", "status_code": "abc"})) else {
            panic!("expected response template");
        };
        let rendered = render_template(&empty);
        assert_eq!(rendered.status, 200);
        assert_eq!(rendered.body, "");
    }
}
