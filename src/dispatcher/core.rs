use crate::introspection;
use crate::server::{Context, RenderArgs};
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Request handler
pub type Handler = Arc<dyn Fn(&mut Context) -> anyhow::Result<()> + Send + Sync>;

/// Handler name bound to every contract's introspection route.
pub const INTROSPECTION_HANDLER: &str = "specroute.spec";
/// Name reported for the fallback handler in logs.
pub const FALLBACK_HANDLER: &str = "fallback";

/// Handler registry
#[derive(Clone)]
pub struct Dispatcher {
    handlers: HashMap<String, Handler>,
    fallback: Option<Handler>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("Dispatcher")
            .field("handlers", &names)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

impl Dispatcher {
    /// Registry with the introspection handler pre-registered.
    #[must_use]
    pub fn new() -> Self {
        let mut dispatcher = Self {
            handlers: HashMap::new(),
            fallback: None,
        };
        dispatcher.register(INTROSPECTION_HANDLER, introspection::serve);
        dispatcher
    }

    /// Register `handler` under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(&mut Context) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        if self
            .handlers
            .insert(name.to_string(), Arc::new(handler))
            .is_some()
        {
            debug!(handler_name = %name, "Handler replaced");
        }
    }

    /// Handler used when no registered handler matches a route.
    pub fn set_fallback<F>(&mut self, handler: F)
    where
        F: Fn(&mut Context) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(handler));
    }

    #[must_use]
    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Resolve the handler for the matched route in `c`.
    #[must_use]
    pub fn resolve(&self, c: &Context) -> Option<(String, Handler)> {
        let lookup = |name: &str| {
            self.handlers
                .get(name)
                .map(|h| (name.to_string(), Arc::clone(h)))
        };

        if let Some(found) = c.param("handler").and_then(Value::as_str).and_then(lookup) {
            return Some(found);
        }
        let controller = c.param("controller").and_then(Value::as_str);
        let action = c.param("action").and_then(Value::as_str);
        if let (Some(controller), Some(action)) = (controller, action) {
            if let Some(found) = lookup(format!("{controller}#{action}").as_str()) {
                return Some(found);
            }
        }
        if let Some(found) = c
            .route_match()
            .and_then(|m| m.endpoint.name.as_deref())
            .and_then(lookup)
        {
            return Some(found);
        }
        self.fallback
            .as_ref()
            .map(|h| (FALLBACK_HANDLER.to_string(), Arc::clone(h)))
    }

    /// Run the resolved handler and make sure something was rendered.
    pub fn dispatch(&self, c: &mut Context) {
        let Some((handler_name, handler)) = self.resolve(c) else {
            debug!(request_id = %c.request_id, path = %c.request.path, "No handler resolved");
            c.render(RenderArgs::empty());
            return;
        };

        let started = Instant::now();
        match catch_unwind(AssertUnwindSafe(|| handler(c))) {
            Ok(Ok(())) => {
                info!(
                    request_id = %c.request_id,
                    handler_name = %handler_name,
                    execution_time_us = started.elapsed().as_micros(),
                    "Handler execution complete"
                );
            }
            Ok(Err(err)) => {
                error!(
                    request_id = %c.request_id,
                    handler_name = %handler_name,
                    error = %err,
                    "Handler failed"
                );
                c.render(RenderArgs::exception(err.to_string()));
            }
            Err(panic) => {
                let message = panic_message(&*panic);
                error!(
                    request_id = %c.request_id,
                    handler_name = %handler_name,
                    panic_message = %message,
                    "Handler panicked"
                );
                c.render(RenderArgs::exception(message));
            }
        }

        if !c.is_rendered() {
            c.render(RenderArgs::empty());
        }
    }
}
