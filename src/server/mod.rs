//! # Server Module
//!
//! Per-request state and the `may_minihttp` service wiring.
//!
//! ## Overview
//!
//! - [`ParsedRequest`]: method, path, headers, cookies, query, form and body,
//!   extracted once per request
//! - [`Context`]: matched route, bound parameters and the render primitive
//! - [`HttpResponse`]: status, content type and bytes produced by a render
//! - [`AppService`]: routes, dispatches and renders; [`AppService::handle`] is
//!   callable without a socket
//! - [`HttpServer`] / [`ServerHandle`]: start, wait for readiness, stop

mod context;
mod http_server;
mod request;
mod response;
mod service;

pub use context::{Context, RenderArgs, FORMATS};
pub use http_server::{HttpServer, ServerHandle, MAX_HEADERS};
pub use request::{decode_body, parse_cookies, parse_query, parse_request, ParsedRequest};
pub use response::{
    status_reason, write_response, HttpResponse, CONTENT_TYPE_JSON, CONTENT_TYPE_TEXT,
    CONTENT_TYPE_YAML,
};
pub use service::AppService;
