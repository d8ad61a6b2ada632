use super::context::Context;
use super::request::{parse_request, ParsedRequest};
use super::response::{write_response, HttpResponse};
use crate::dispatcher::Dispatcher;
use crate::router::Router;
use may_minihttp::{HttpService, Request, Response};
use serde_json::json;
use std::io;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// HTTP service routing requests through a frozen [`Router`] into a [`Dispatcher`]
#[derive(Clone)]
pub struct AppService {
    pub router: Arc<Router>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppService {
    pub fn new(router: Arc<Router>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { router, dispatcher }
    }

    /// Route, dispatch and render one request.
    #[must_use]
    pub fn handle(&self, request: ParsedRequest) -> HttpResponse {
        let started = Instant::now();
        let Some(matched) = self.router.route(&request.method, &request.path) else {
            debug!(method = %request.method, path = %request.path, "No route for request");
            return HttpResponse::json(
                404,
                &json!({
                    "error": "Not Found",
                    "method": request.method.as_str(),
                    "path": request.path,
                }),
            );
        };

        let mut c = Context::new(request, Arc::clone(&self.router), Some(matched));
        self.dispatcher.dispatch(&mut c);

        let request_id = c.request_id.to_string();
        let method = c.request.method.clone();
        let path = c.request.path.clone();
        let response = c.into_response();
        info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = response.status,
            latency_ms = started.elapsed().as_millis(),
            "Request complete"
        );
        response
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let request = parse_request(req)?;
        write_response(res, self.handle(request));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::RouteTable;
    use crate::server::RenderArgs;
    use http::Method;

    fn service() -> AppService {
        let mut table = RouteTable::new();
        let hello = table.any(table.root(), "/hello/<who>").unwrap();
        table.via(hello, [Method::GET]).unwrap();
        table.to(hello, "hello").unwrap();

        let mut dispatcher = Dispatcher::new();
        dispatcher.register("hello", |c| {
            let who = c.param("who").cloned().unwrap_or_default();
            c.render(RenderArgs::json(json!({ "hello": who })));
            Ok(())
        });
        AppService::new(Arc::new(Router::new(table).unwrap()), Arc::new(dispatcher))
    }

    #[test]
    fn test_handle_matched() {
        let res = service().handle(ParsedRequest::new(Method::GET, "/hello/world"));
        assert_eq!(res.status, 200);
        assert_eq!(res.json_body(), Some(json!({"hello": "world"})));
    }

    #[test]
    fn test_handle_unmatched() {
        let res = service().handle(ParsedRequest::new(Method::POST, "/hello/world"));
        assert_eq!(res.status, 404);
        assert_eq!(
            res.json_body(),
            Some(json!({"error": "Not Found", "method": "POST", "path": "/hello/world"}))
        );
    }
}
