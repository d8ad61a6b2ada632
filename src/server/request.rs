use http::Method;
use may_minihttp::Request;
use serde_json::Value;
use std::collections::HashMap;
use std::io::{self, Read};
use tracing::debug;

/// Parsed HTTP request data used by `AppService`.
///
/// Owns everything the router, validator and handlers read. The builder methods
/// construct requests without a socket, which is how tests drive
/// [`AppService::handle`](super::AppService::handle).
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRequest {
    pub method: Method,
    /// Request path without the query string
    pub path: String,
    /// HTTP headers (lowercase keys)
    pub headers: HashMap<String, String>,
    /// Parsed cookies from the Cookie header
    pub cookies: HashMap<String, String>,
    /// Query pairs in arrival order; repeated keys are kept
    pub query: Vec<(String, String)>,
    /// `application/x-www-form-urlencoded` body pairs
    pub form: Vec<(String, String)>,
    /// JSON body. A body that is not valid JSON is kept as a string.
    pub body: Option<Value>,
}

impl ParsedRequest {
    /// Build a request from a method and a path that may carry a query string.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (target, Vec::new()),
        };
        Self {
            method,
            path: if path.is_empty() { "/" } else { path }.to_string(),
            headers: HashMap::new(),
            cookies: HashMap::new(),
            query,
            form: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self.cookies = parse_cookies(&self.headers);
        self
    }

    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.headers
            .insert("content-type".to_string(), "application/json".to_string());
        self.body = Some(body);
        self
    }

    /// Attach a raw body, decoded according to `content_type`.
    #[must_use]
    pub fn with_body(mut self, content_type: &str, body: &[u8]) -> Self {
        self.headers
            .insert("content-type".to_string(), content_type.to_string());
        let (json, form) = decode_body(content_type, body);
        self.body = json;
        self.form = form;
        self
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Parse the `Cookie` header into name/value pairs.
pub fn parse_cookies(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .get("cookie")
        .map(|c| {
            c.split(';')
                .filter_map(|pair| {
                    let (name, value) = pair.trim().split_once('=').unwrap_or((pair.trim(), ""));
                    if name.is_empty() {
                        return None;
                    }
                    Some((name.to_string(), value.trim().to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// URL-decode a query string, keeping repeated keys.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Decode a request body into a JSON value and/or form pairs.
pub fn decode_body(content_type: &str, bytes: &[u8]) -> (Option<Value>, Vec<(String, String)>) {
    if bytes.is_empty() {
        return (None, Vec::new());
    }
    if content_type
        .to_ascii_lowercase()
        .starts_with("application/x-www-form-urlencoded")
    {
        let form = url::form_urlencoded::parse(bytes)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        return (None, form);
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(json) => (Some(json), Vec::new()),
        Err(_) => (
            Some(Value::String(String::from_utf8_lossy(bytes).into_owned())),
            Vec::new(),
        ),
    }
}

/// Parse a `may_minihttp` request.
///
/// # Errors
///
/// Fails on an unparsable method or when the body cannot be read.
pub fn parse_request(req: Request) -> io::Result<ParsedRequest> {
    let method = Method::from_bytes(req.method().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut parsed = ParsedRequest::new(method, req.path());

    parsed.headers = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();
    parsed.cookies = parse_cookies(&parsed.headers);

    let mut bytes = Vec::new();
    req.body().read_to_end(&mut bytes)?;
    let content_type = parsed
        .headers
        .get("content-type")
        .map(String::as_str)
        .unwrap_or("application/json");
    let (body, form) = decode_body(content_type, &bytes);
    parsed.body = body;
    parsed.form = form;

    debug!(
        method = %parsed.method,
        path = %parsed.path,
        header_count = parsed.headers.len(),
        query_count = parsed.query.len(),
        body_size_bytes = bytes.len(),
        "HTTP request parsed"
    );
    Ok(parsed)
}
