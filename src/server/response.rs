use may_minihttp::Response;
use serde_json::Value;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_YAML: &str = "application/yaml";
pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";

/// Fully rendered response, independent of the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            content_type: CONTENT_TYPE_JSON,
            body: body.to_string().into_bytes(),
        }
    }

    #[must_use]
    pub fn text(status: u16, content_type: &'static str, body: String) -> Self {
        Self {
            status,
            content_type,
            body: body.into_bytes(),
        }
    }

    /// Body parsed as JSON, `None` when it is not JSON.
    #[must_use]
    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[must_use]
pub fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

fn content_type_header(content_type: &'static str) -> &'static str {
    match content_type {
        CONTENT_TYPE_YAML => "Content-Type: application/yaml",
        CONTENT_TYPE_TEXT => "Content-Type: text/plain; charset=utf-8",
        _ => "Content-Type: application/json",
    }
}

/// Write a rendered response onto the `may_minihttp` response.
pub fn write_response(res: &mut Response, response: HttpResponse) {
    res.status_code(usize::from(response.status), status_reason(response.status));
    res.header(content_type_header(response.content_type));
    res.body_vec(response.body);
}
