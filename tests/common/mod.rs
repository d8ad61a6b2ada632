//! Shared fixtures for integration tests
#![allow(dead_code)]

use serde_json::Value;
use specroute::config::PluginConfig;
use specroute::contract::{load_contract_from_value, ContractModel};
use specroute::dispatcher::Dispatcher;
use specroute::router::{RouteTable, Router};
use specroute::server::AppService;
use specroute::synthesizer::{RouteSynthesizer, Synthesis};
use std::sync::Arc;

/// Swagger 2.0 pet store. `POST /pets` requires an integer `age` query
/// parameter and a body; `GET /pets` answers an array of pets.
pub const PETSTORE: &str = r##"
swagger: "2.0"
info:
  title: Pet Store
  version: "1.0.0"
host: internal.example:9999
basePath: /api
paths:
  x-internal-note: ignored
  /pets:
    get:
      operationId: listPets
      parameters:
        - name: limit
          in: query
          type: integer
          default: 20
      responses:
        "200":
          description: All pets
          schema:
            type: array
            items:
              $ref: "#/definitions/Pet"
          examples:
            application/json:
              - id: 1
                name: Rex
    post:
      operationId: addPet
      parameters:
        - name: age
          in: query
          required: true
          type: integer
        - name: pet
          in: body
          required: true
          schema:
            $ref: "#/definitions/NewPet"
      responses:
        "201":
          description: Created
          schema:
            $ref: "#/definitions/Pet"
  /pets/{petId}:
    x-owner: pets-team
    get:
      operationId: showPetById
      parameters:
        - name: petId
          in: path
          required: true
          type: integer
          x-specroute-placeholder: numeric
      responses:
        "200":
          description: One pet
          schema:
            $ref: "#/definitions/Pet"
    delete:
      x-specroute-to: pets#destroy
      parameters:
        - name: petId
          in: path
          required: true
          type: integer
      responses:
        "204":
          description: Deleted
definitions:
  Pet:
    type: object
    required: [id, name]
    properties:
      id:
        type: integer
      name:
        type: string
  NewPet:
    type: object
    required: [name]
    properties:
      name:
        type: string
      tag:
        type: string
"##;

/// OpenAPI 3.0 variant mounted from `servers[0]`.
pub const PETSTORE_V3: &str = r##"
openapi: 3.0.3
info:
  title: Pet Store
  version: "1.0.0"
servers:
  - url: https://pets.example/v3
paths:
  /pets:
    get:
      operationId: listPets
      responses:
        "200":
          description: All pets
          content:
            application/json:
              schema:
                type: array
                items:
                  $ref: "#/components/schemas/Pet"
components:
  schemas:
    Pet:
      type: object
      required: [id]
      properties:
        id:
          type: integer
"##;

pub fn document(yaml: &str) -> Value {
    serde_yaml::from_str(yaml).expect("fixture YAML should parse")
}

pub fn contract(yaml: &str) -> ContractModel {
    load_contract_from_value(document(yaml), "file:///fixtures/petstore.yaml")
        .expect("fixture contract should load")
}

/// Synthesize `yaml` with `config` into a fresh table.
pub fn synthesize(yaml: &str, config: PluginConfig) -> (RouteTable, Synthesis) {
    let mut table = RouteTable::new();
    let synthesis = RouteSynthesizer::new(config)
        .synthesize(&mut table, contract(yaml))
        .expect("synthesis should succeed");
    (table, synthesis)
}

/// A service over the pet store with handlers from `register`.
pub fn petstore_service(
    config: PluginConfig,
    register: impl FnOnce(&mut Dispatcher),
) -> AppService {
    service(PETSTORE, config, register)
}

pub fn service(
    yaml: &str,
    config: PluginConfig,
    register: impl FnOnce(&mut Dispatcher),
) -> AppService {
    let (table, _synthesis) = synthesize(yaml, config);
    let mut dispatcher = Dispatcher::new();
    register(&mut dispatcher);
    let router = Router::new(table).expect("routes should compile");
    AppService::new(Arc::new(router), Arc::new(dispatcher))
}

/// `(path, message)` pairs of an error document.
pub fn error_entries(doc: &Value) -> Vec<(String, String)> {
    doc["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .map(|e| {
                    (
                        e["path"].as_str().unwrap_or_default().to_string(),
                        e["message"].as_str().unwrap_or_default().to_string(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

pub mod test_server {
    use std::sync::Once;

    static MAY_INIT: Once = Once::new();

    /// Configure the coroutine runtime once per test binary.
    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }
}
