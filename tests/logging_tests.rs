//! Validation failures are logged with their direction at the configured level
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::petstore_service;
use http::Method;
use serde_json::json;
use specroute::config::{LogLevel, PluginConfig};
use specroute::dispatcher::Dispatcher;
use specroute::server::ParsedRequest;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

#[derive(Debug, Clone)]
struct Captured {
    level: Level,
    fields: BTreeMap<String, String>,
}

#[derive(Default)]
struct Fields(BTreeMap<String, String>);

impl Visit for Fields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

#[derive(Clone, Default)]
struct CaptureLayer(Arc<Mutex<Vec<Captured>>>);

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = Fields::default();
        event.record(&mut fields);
        self.0.lock().unwrap().push(Captured {
            level: *event.metadata().level(),
            fields: fields.0,
        });
    }
}

/// Run `f` with a subscriber that records every event, and return the events
/// carrying a `direction` field.
fn directed_events(f: impl FnOnce()) -> Vec<Captured> {
    let capture = CaptureLayer::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    tracing::subscriber::with_default(subscriber, f);
    let events = capture.0.lock().unwrap().clone();
    events
        .into_iter()
        .filter(|e| e.fields.contains_key("direction"))
        .collect()
}

fn handlers(d: &mut Dispatcher) {
    d.register("addPet", |c| {
        c.openapi().unwrap().validate_request(c)?;
        Ok(())
    });
    d.register("listPets", |c| {
        let api = c.openapi().unwrap();
        api.render_response(c, 200, json!({"not": "an array"}))?;
        Ok(())
    });
}

#[test]
fn test_request_failure_is_logged_inbound() {
    let service = petstore_service(PluginConfig::default().with_log_level(LogLevel::Error), handlers);

    let events = directed_events(|| {
        let res = service.handle(ParsedRequest::new(Method::POST, "/api/pets"));
        assert_eq!(res.status, 400);
    });

    assert_eq!(events.len(), 1, "{events:?}");
    assert_eq!(events[0].level, Level::ERROR);
    assert_eq!(events[0].fields["direction"], "inbound");
    assert!(events[0].fields["operation"].starts_with("POST "));
    assert!(events[0].fields["errors"].contains("/age"));
}

#[test]
fn test_response_failure_is_logged_outbound() {
    let service = petstore_service(PluginConfig::default().with_log_level(LogLevel::Warn), handlers);

    let events = directed_events(|| {
        let res = service.handle(ParsedRequest::new(Method::GET, "/api/pets"));
        assert_eq!(res.status, 500);
    });

    assert_eq!(events.len(), 1, "{events:?}");
    assert_eq!(events[0].level, Level::WARN);
    assert_eq!(events[0].fields["direction"], "outbound");
    assert_eq!(events[0].fields["status"], "200");
}

#[test]
fn test_valid_request_logs_no_failure() {
    let service = petstore_service(PluginConfig::default(), |d| {
        d.register("listPets", |c| {
            let api = c.openapi().unwrap();
            if api.validate_request(c)?.is_valid() {
                api.render_response(c, 200, json!([]))?;
            }
            Ok(())
        });
    });

    let events = directed_events(|| {
        let res = service.handle(ParsedRequest::new(Method::GET, "/api/pets"));
        assert_eq!(res.status, 200);
    });
    assert!(events.is_empty(), "{events:?}");
}
