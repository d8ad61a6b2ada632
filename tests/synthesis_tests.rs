//! Contract-to-route synthesis against compiled routers
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{contract, synthesize, PETSTORE, PETSTORE_V3};
use http::Method;
use serde_json::json;
use specroute::config::PluginConfig;
use specroute::router::{RouteTable, Router};
use specroute::synthesizer::{RouteSynthesizer, SynthesisError};
use std::io::Write;

#[test]
fn test_one_route_per_operation() {
    let (_table, synthesis) = synthesize(PETSTORE, PluginConfig::default());
    assert_eq!(synthesis.routes.len(), synthesis.contract.operation_count());
    assert_eq!(synthesis.routes.len(), 4);

    let patterns: Vec<&str> = synthesis.routes.iter().map(|b| b.pattern.as_str()).collect();
    assert_eq!(
        patterns,
        [
            "/api/pets",
            "/api/pets",
            "/api/pets/<petId>",
            "/api/pets/<petId:num>",
        ]
    );
}

#[test]
fn test_resynthesis_is_stable() {
    let (_a, first) = synthesize(PETSTORE, PluginConfig::default());
    let (_b, second) = synthesize(PETSTORE, PluginConfig::default());
    let render = |s: &specroute::Synthesis| {
        s.routes
            .iter()
            .map(|b| (b.pattern.clone(), b.operation.method.clone(), b.name.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(render(&first), render(&second));
}

#[test]
fn test_numeric_placeholder_routing() {
    let (table, _) = synthesize(PETSTORE, PluginConfig::default());
    let router = Router::new(table).unwrap();

    let m = router.route(&Method::GET, "/api/pets/42").unwrap();
    assert_eq!(m.endpoint.name.as_deref(), Some("showPetById"));
    assert_eq!(m.get_path_param("petId"), Some("42"));
    assert!(router.route(&Method::GET, "/api/pets/rex").is_none());

    // DELETE declares no kind, so any segment matches.
    let m = router.route(&Method::DELETE, "/api/pets/rex").unwrap();
    assert_eq!(m.params["controller"], json!("pets"));
    assert_eq!(m.params["action"], json!("destroy"));
    assert!(router.route(&Method::PUT, "/api/pets/1").is_none());
}

#[test]
fn test_register_from_file() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(PETSTORE.as_bytes()).unwrap();
    let source = file.path().to_str().unwrap().to_string();

    let mut table = RouteTable::new();
    let synthesis = RouteSynthesizer::new(PluginConfig::new(&source))
        .register(&mut table)
        .unwrap();
    assert_eq!(synthesis.routes.len(), 4);
    assert_eq!(synthesis.contract.document()["id"], json!(source));
}

#[test]
fn test_register_missing_file() {
    let err = RouteSynthesizer::new(PluginConfig::new("/nonexistent/specroute/pets.yaml"))
        .register(&mut RouteTable::new())
        .unwrap_err();
    assert!(matches!(err, SynthesisError::Contract(_)));
}

#[test]
fn test_openapi3_base_path_from_servers() {
    let (table, synthesis) = synthesize(PETSTORE_V3, PluginConfig::default());
    assert_eq!(synthesis.contract.base_path, "/v3");
    assert_eq!(synthesis.routes[0].pattern, "/v3/pets");
    let router = Router::new(table).unwrap();
    assert!(router.route(&Method::GET, "/v3/pets/").is_some());
}

#[test]
fn test_two_contracts_share_a_table() {
    let mut table = RouteTable::new();
    let v2 = table.any(table.root(), "/v2").unwrap();
    let first = RouteSynthesizer::new(PluginConfig::default().with_route(v2))
        .synthesize(&mut table, contract(PETSTORE))
        .unwrap();
    let second = RouteSynthesizer::new(PluginConfig::default())
        .synthesize(&mut table, contract(PETSTORE_V3))
        .unwrap();
    assert_eq!(first.contract.base_path, "/v2");
    assert_eq!(second.contract.base_path, "/v3");

    // Names are table-wide: `listPets` of the second contract reuses the route.
    let reused = second.routes.iter().find(|b| b.name.as_deref() == Some("listPets")).unwrap();
    assert!(reused.reused);
    assert_eq!(table.parent(reused.route).unwrap(), Some(second.scope));
}

#[test]
fn test_root_base_path() {
    let yaml = PETSTORE.replace("basePath: /api", "basePath: /");
    let (table, synthesis) = synthesize(&yaml, PluginConfig::default());
    assert_eq!(synthesis.contract.base_path, "/");
    assert_eq!(synthesis.routes[0].pattern, "/pets");
    let router = Router::new(table).unwrap();
    assert!(router.route(&Method::GET, "/").is_some());
    assert!(router.route(&Method::GET, "/pets").is_some());
}
