//! # specroute
//!
//! **specroute** turns an OpenAPI 3.x or Swagger 2.0 contract into a live route
//! table and validates every inbound request and outbound response against it,
//! answering failures with one uniform error document.
//!
//! ## Overview
//!
//! A contract is loaded once at startup. Its operations become routes of a
//! [`RouteTable`](router::RouteTable), each carrying the operation it was built
//! from. Handlers are ordinary functions over a [`Context`](server::Context) and
//! call the contract's [`ValidationOrchestrator`](orchestrator::ValidationOrchestrator)
//! to validate input and render output.
//!
//! ## Architecture
//!
//! - **[`contract`]** - contract loading, meta-validation and the read-only model
//! - **[`synthesizer`]** - contract-to-route synthesis
//! - **[`router`]** - route tree, names, metadata and the compiled matcher
//! - **[`validator`]** - JSON Schema validation of parameters, bodies and responses
//! - **[`orchestrator`]** - validate-and-bind, validate-and-render
//! - **[`error_render`]** - the pre-render stage producing error documents
//! - **[`introspection`]** - the contract document served at the mount root
//! - **[`dispatcher`]** - handler registry and dispatch
//! - **[`server`]** - request context, rendering and the `may_minihttp` service
//! - **[`config`]**, **[`logging`]**, **[`cli`]** - the service around it
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Service as server::AppService
//!     participant Router as router::Router
//!     participant Dispatcher as dispatcher::Dispatcher
//!     participant Handler
//!     participant API as orchestrator::ValidationOrchestrator
//!     participant Render as error_render
//!
//!     Client->>Service: HTTP request
//!     Service->>Router: route(method, path)
//!     Router-->>Service: RouteMatch (params over defaults)
//!     Service->>Dispatcher: dispatch(&mut Context)
//!     Dispatcher->>Handler: handler(&mut Context)
//!     Handler->>API: validate_request(c)
//!     API-->>Handler: outcome (400 rendered and halted on failure)
//!     Handler->>API: render_response(c, 200, payload)
//!     API->>Render: Context::render(args)
//!     Render-->>Service: HttpResponse
//!     Service-->>Client: status + body
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use serde_json::json;
//! use specroute::config::PluginConfig;
//! use specroute::dispatcher::Dispatcher;
//! use specroute::router::{RouteTable, Router};
//! use specroute::server::{AppService, HttpServer};
//! use specroute::synthesizer::RouteSynthesizer;
//! use std::sync::Arc;
//!
//! let mut table = RouteTable::new();
//! RouteSynthesizer::new(PluginConfig::new("demos/petstore.yaml")).register(&mut table)?;
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.register("listPets", |c| {
//!     let Some(api) = c.openapi() else { anyhow::bail!("no contract") };
//!     if api.validate_request(c)?.is_valid() {
//!         api.render_response(c, 200, json!([{"id": 1, "name": "Rex"}]))?;
//!     }
//!     Ok(())
//! });
//!
//! let service = AppService::new(Arc::new(Router::new(table)?), Arc::new(dispatcher));
//! HttpServer(service).start("127.0.0.1:8080")?.join().ok();
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Error Documents
//!
//! ```json
//! {"errors": [{"path": "/body/name", "message": "\"name\" is a required property"}], "status": 400}
//! ```
//!
//! | Status | Cause |
//! |--------|-------|
//! | 400 | request validation failed |
//! | 500 | response validation failed, or the handler failed or panicked |
//! | 501 | the handler rendered nothing |

pub mod cli;
pub mod config;
pub mod contract;
pub mod dispatcher;
pub mod error_render;
pub mod ids;
pub mod introspection;
pub mod logging;
pub mod orchestrator;
pub mod router;
pub mod server;
pub mod synthesizer;
pub mod validator;

pub use config::{LogLevel, PluginConfig, ServiceConfig};
pub use contract::{load_contract, ContractError, ContractModel, OperationSpec};
pub use dispatcher::Dispatcher;
pub use orchestrator::{OrchestratorError, ValidationOrchestrator};
pub use router::{RouteId, RouteTable, Router};
pub use server::{AppService, Context, HttpServer, RenderArgs};
pub use synthesizer::{RouteBinding, RouteSynthesizer, Synthesis, SynthesisError};
pub use validator::{JsonSchemaValidator, SchemaValidator, ValidationError, ValidationOutcome};
