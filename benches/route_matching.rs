use criterion::{criterion_group, criterion_main, Criterion};
use http::Method;
use serde_json::json;
use specroute::config::PluginConfig;
use specroute::contract::load_contract_from_value;
use specroute::router::{RouteTable, Router};
use specroute::synthesizer::RouteSynthesizer;
use std::hint::black_box;

fn zoo_contract() -> serde_json::Value {
    let ok = json!({"200": {"description": "OK"}});
    json!({
        "swagger": "2.0",
        "info": {"title": "Verb Zoo", "version": "1.0.0"},
        "basePath": "/zoo",
        "paths": {
            "/animals": {"get": {"operationId": "listAnimals", "responses": ok},
                         "post": {"operationId": "createAnimal", "responses": ok}},
            "/animals/{id}": {
                "get": {"operationId": "getAnimal", "responses": ok,
                        "parameters": [{"name": "id", "in": "path", "required": true,
                                        "type": "integer", "x-specroute-placeholder": "numeric"}]},
                "put": {"operationId": "updateAnimal", "responses": ok},
                "delete": {"operationId": "deleteAnimal", "responses": ok}
            },
            "/animals/{id}/toys/{toy_id}": {"get": {"operationId": "animalToy", "responses": ok}},
            "/{category}/animals/{id}/habitats/{habitat_id}/sections/{section_id}": {
                "get": {"operationId": "habitatSection", "responses": ok}
            },
            "/files/{path}": {"get": {"operationId": "zooFile", "responses": ok,
                              "parameters": [{"name": "path", "in": "path", "required": true,
                                              "type": "string", "x-specroute-placeholder": "wildcard"}]}},
            "/complex/{a}/{b}/{c}/{d}/{e}/{f}/{g}/{h}/{i}": {
                "get": {"operationId": "complexManyParams", "responses": ok}
            }
        }
    })
}

fn zoo_router() -> Router {
    let contract = load_contract_from_value(zoo_contract(), "bench").expect("bench contract");
    let mut table = RouteTable::new();
    RouteSynthesizer::new(PluginConfig::default())
        .synthesize(&mut table, contract)
        .expect("bench synthesis");
    Router::new(table).expect("bench router")
}

fn bench_route_matching(c: &mut Criterion) {
    let router = zoo_router();
    let paths = [
        (Method::GET, "/zoo/animals/123"),
        (Method::GET, "/zoo/animals/123/toys/456"),
        (Method::GET, "/zoo/cats/animals/123/habitats/88/sections/5"),
        (Method::GET, "/zoo/files/maps/north/gate.png"),
        (Method::GET, "/zoo/complex/1/2/3/4/5/6/7/8/9"),
        (Method::PATCH, "/zoo/animals/123"),
    ];
    c.bench_function("route_match", |b| {
        b.iter(|| {
            for (method, path) in &paths {
                black_box(router.route(method, path));
            }
        });
    });
}

fn bench_synthesis(c: &mut Criterion) {
    c.bench_function("synthesize_and_compile", |b| b.iter(|| black_box(zoo_router())));
}

criterion_group!(benches, bench_route_matching, bench_synthesis);
criterion_main!(benches);
