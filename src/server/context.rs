use super::request::ParsedRequest;
use super::response::{HttpResponse, CONTENT_TYPE_TEXT, CONTENT_TYPE_YAML};
use crate::contract::{ContractModel, OperationSpec};
use crate::error_render;
use crate::ids::RequestId;
use crate::orchestrator::ValidationOrchestrator;
use crate::router::{RouteId, RouteMatch, Router};
use crate::synthesizer::{CONTRACT_KEY, OPERATION_KEY, ORCHESTRATOR_KEY};
use serde_json::{json, Map, Value};
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, error};

/// Content formats the render stage can produce, in lookup order.
pub const FORMATS: [&str; 3] = ["json", "yaml", "text"];

/// Arguments of one render call
///
/// `body` is keyed by format (`json`, `yaml`, `text`). `exception` marks a
/// render triggered by a handler failure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderArgs {
    pub status: Option<u16>,
    pub exception: Option<String>,
    pub body: Map<String, Value>,
}

impl RenderArgs {
    /// Render with no content; on API routes this becomes a 501.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn json(value: Value) -> Self {
        Self::format("json", value)
    }

    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::format("text", Value::String(value.into()))
    }

    #[must_use]
    pub fn format(format: &str, value: Value) -> Self {
        let mut body = Map::new();
        body.insert(format.to_string(), value);
        Self {
            body,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn exception(message: impl Into<String>) -> Self {
        Self {
            exception: Some(message.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

/// Per-request state handed to handlers
pub struct Context {
    pub request: ParsedRequest,
    pub request_id: RequestId,
    router: Arc<Router>,
    matched: Option<RouteMatch>,
    params: Map<String, Value>,
    response: Option<HttpResponse>,
    halted: bool,
}

impl Context {
    pub fn new(request: ParsedRequest, router: Arc<Router>, matched: Option<RouteMatch>) -> Self {
        let request_id = RequestId::from_header_or_new(request.header("x-request-id"));
        let params = matched
            .as_ref()
            .map(|m| m.params.clone())
            .unwrap_or_default();
        Self {
            request,
            request_id,
            router,
            matched,
            params,
            response: None,
            halted: false,
        }
    }

    #[must_use]
    pub fn route(&self) -> Option<RouteId> {
        self.matched.as_ref().map(RouteMatch::route)
    }

    #[must_use]
    pub fn route_match(&self) -> Option<&RouteMatch> {
        self.matched.as_ref()
    }

    #[must_use]
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Operation bound to the matched route.
    #[must_use]
    pub fn operation(&self) -> Option<Arc<OperationSpec>> {
        self.router.table().metadata(self.route()?, OPERATION_KEY)
    }

    /// Orchestrator of the contract the matched route belongs to.
    #[must_use]
    pub fn openapi(&self) -> Option<Arc<ValidationOrchestrator>> {
        self.find_metadata(ORCHESTRATOR_KEY)
    }

    #[must_use]
    pub fn contract(&self) -> Option<Arc<ContractModel>> {
        self.find_metadata(CONTRACT_KEY)
    }

    #[must_use]
    pub fn find_metadata<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.router.table().find_metadata(self.route()?, key)
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    #[must_use]
    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.params.insert(name.into(), value);
    }

    /// Negotiated format: the `format` parameter, then `Accept`, then `json`.
    #[must_use]
    pub fn format(&self) -> &'static str {
        if let Some(format) = self.param("format").and_then(Value::as_str) {
            if let Some(known) = FORMATS.iter().find(|f| **f == format) {
                return *known;
            }
        }
        match self.request.header("accept") {
            Some(accept) if accept.contains("yaml") => "yaml",
            Some(accept) if accept.contains("text/plain") => "text",
            _ => "json",
        }
    }

    /// Stop further rendering; later renders are ignored.
    pub fn halt(&mut self) {
        self.halted = true;
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    #[must_use]
    pub fn is_rendered(&self) -> bool {
        self.response.is_some()
    }

    #[must_use]
    pub fn response(&self) -> Option<&HttpResponse> {
        self.response.as_ref()
    }

    /// Render the response: the error-render stage runs first, then the
    /// rendered body is produced under the first known format key.
    pub fn render(&mut self, mut args: RenderArgs) {
        if self.halted {
            debug!(request_id = %self.request_id, "Render ignored after halt");
            return;
        }
        error_render::before_render(self, &mut args);
        self.response = Some(finish_render(args));
    }

    /// The rendered response, or 404 when nothing was rendered.
    #[must_use]
    pub fn into_response(self) -> HttpResponse {
        self.response
            .unwrap_or_else(|| HttpResponse::json(404, &json!({"error": "Not Found"})))
    }
}

fn finish_render(args: RenderArgs) -> HttpResponse {
    let status = args.status.unwrap_or(200);
    for format in FORMATS {
        let Some(value) = args.body.get(format) else {
            continue;
        };
        return match format {
            "yaml" => match serde_yaml::to_string(value) {
                Ok(text) => HttpResponse::text(status, CONTENT_TYPE_YAML, text),
                Err(err) => {
                    error!(error = %err, "YAML rendering failed");
                    HttpResponse::json(500, &json!({"error": "Internal Server Error"}))
                }
            },
            "text" => {
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                HttpResponse::text(status, CONTENT_TYPE_TEXT, text)
            }
            _ => HttpResponse::json(status, value),
        };
    }
    if args.exception.is_some() {
        HttpResponse::json(500, &json!({"error": "Internal Server Error"}))
    } else {
        HttpResponse::json(404, &json!({"error": "Not Found"}))
    }
}
