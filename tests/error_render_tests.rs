//! Error documents for failed, empty and exceptional renders
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{error_entries, petstore_service};
use http::Method;
use serde_json::{json, Value};
use specroute::config::PluginConfig;
use specroute::server::{ParsedRequest, RenderArgs, CONTENT_TYPE_YAML};

#[test]
fn test_silent_handler_is_not_implemented() {
    let service = petstore_service(PluginConfig::default(), |d| {
        d.register("listPets", |_c| Ok(()));
    });
    let res = service.handle(ParsedRequest::new(Method::GET, "/api/pets"));
    assert_eq!(res.status, 501);
    let doc = res.json_body().unwrap();
    assert_eq!(doc["status"], json!(501));
    assert_eq!(
        error_entries(&doc),
        [("/".to_string(), "Not implemented.".to_string())]
    );
}

#[test]
fn test_unhandled_operation_is_not_implemented() {
    let service = petstore_service(PluginConfig::default(), |_d| {});
    let res = service.handle(ParsedRequest::new(Method::DELETE, "/api/pets/1"));
    assert_eq!(res.status, 501);
}

#[test]
fn test_failing_handler_is_internal_error() {
    let service = petstore_service(PluginConfig::default(), |d| {
        d.register("listPets", |_c| anyhow::bail!("database unavailable"));
        d.register("showPetById", |_c| panic!("unexpected state"));
    });

    for path in ["/api/pets", "/api/pets/1"] {
        let res = service.handle(ParsedRequest::new(Method::GET, path));
        assert_eq!(res.status, 500, "{path}");
        let doc = res.json_body().unwrap();
        assert_eq!(
            error_entries(&doc),
            [("/".to_string(), "Internal server error.".to_string())],
            "{path}"
        );
        // The cause stays in the logs.
        assert!(!res.body_text().contains("database"));
    }
}

#[test]
fn test_exception_wins_over_content() {
    let service = petstore_service(PluginConfig::default(), |d| {
        d.register("listPets", |c| {
            c.render(RenderArgs::json(json!([])));
            anyhow::bail!("failed after rendering");
        });
    });
    let res = service.handle(ParsedRequest::new(Method::GET, "/api/pets"));
    assert_eq!(res.status, 500);
}

#[test]
fn test_error_document_follows_accept() {
    let service = petstore_service(PluginConfig::default(), |d| {
        d.register("listPets", |_c| Ok(()));
    });
    let res = service.handle(
        ParsedRequest::new(Method::GET, "/api/pets").with_header("Accept", "application/yaml"),
    );
    assert_eq!(res.status, 501);
    assert_eq!(res.content_type, CONTENT_TYPE_YAML);
    let doc: Value = serde_yaml::from_str(&res.body_text()).unwrap();
    assert_eq!(doc["status"], json!(501));
    assert_eq!(doc["errors"][0]["message"], json!("Not implemented."));
}

#[test]
fn test_validation_errors_follow_accept() {
    let service = petstore_service(PluginConfig::default(), |d| {
        d.register("addPet", |c| {
            c.openapi().unwrap().validate_request(c)?;
            Ok(())
        });
    });
    let res = service.handle(
        ParsedRequest::new(Method::POST, "/api/pets").with_header("Accept", "text/yaml"),
    );
    assert_eq!(res.status, 400);
    let doc: Value = serde_yaml::from_str(&res.body_text()).unwrap();
    assert_eq!(doc["status"], json!(400));
}

#[test]
fn test_unwritable_format_is_not_implemented() {
    let service = petstore_service(PluginConfig::default(), |d| {
        d.register("listPets", |c| {
            c.render(RenderArgs::format("xml", json!("<pets/>")));
            Ok(())
        });
        d.register("showPetById", |c| {
            c.render(RenderArgs::format("xml", json!("<pet/>")));
            anyhow::bail!("failed after rendering");
        });
    });

    let res = service.handle(ParsedRequest::new(Method::GET, "/api/pets"));
    assert_eq!(res.status, 501);
    assert_eq!(
        error_entries(&res.json_body().unwrap()),
        [("/".to_string(), "Not implemented.".to_string())]
    );

    let res = service.handle(ParsedRequest::new(Method::GET, "/api/pets/1"));
    assert_eq!(res.status, 500);
}
