//! # Synthesizer Module
//!
//! Turns a [`ContractModel`] into routes of a [`RouteTable`].
//!
//! ## Overview
//!
//! Synthesis runs once per contract, before the table is compiled into a
//! [`Router`](crate::router::Router):
//!
//! 1. Resolve the scope the contract is mounted under and record its rendered
//!    path as the contract's base path.
//! 2. Attach the contract and its [`ValidationOrchestrator`] to the scope and
//!    add the GET introspection route at the scope root.
//! 3. Walk path templates shortest first. Each operation either reuses a
//!    route already carrying its name (moving it under the scope) or compiles
//!    a new route restricted to the operation's method.
//! 4. Apply the routing directive, bind path parameter defaults and attach
//!    the operation under [`OPERATION_KEY`].
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use specroute::config::PluginConfig;
//! use specroute::contract::load_contract_from_value;
//! use specroute::router::RouteTable;
//! use specroute::synthesizer::RouteSynthesizer;
//!
//! let contract = load_contract_from_value(
//!     json!({
//!         "swagger": "2.0",
//!         "info": {"title": "pets", "version": "1"},
//!         "basePath": "/api",
//!         "paths": {
//!             "/pets/{id}": {
//!                 "get": {"operationId": "showPet", "responses": {"200": {"description": "ok"}}}
//!             }
//!         }
//!     }),
//!     "inline",
//! )
//! .unwrap();
//!
//! let mut table = RouteTable::new();
//! let synthesis = RouteSynthesizer::new(PluginConfig::default())
//!     .synthesize(&mut table, contract)
//!     .unwrap();
//! assert_eq!(synthesis.routes[0].pattern, "/api/pets/<id>");
//! assert_eq!(table.find("showPet"), Some(synthesis.routes[0].route));
//! ```

use crate::config::PluginConfig;
use crate::contract::{load_contract, ContractError, ContractModel, DirectiveArg, OperationSpec};
use crate::dispatcher::INTROSPECTION_HANDLER;
use crate::orchestrator::ValidationOrchestrator;
use crate::router::{PatternError, PlaceholderKind, RouteError, RouteId, RoutePattern, RouteTable};
use crate::validator::{JsonSchemaValidator, SchemaValidator};
use http::Method;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Metadata key of the [`OperationSpec`] bound to an API route.
pub const OPERATION_KEY: &str = "specroute.operation";
/// Metadata key of the [`ContractModel`] on a contract scope.
pub const CONTRACT_KEY: &str = "specroute.contract";
/// Metadata key of the [`ValidationOrchestrator`] on a contract scope.
pub const ORCHESTRATOR_KEY: &str = "specroute.orchestrator";

#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error("invalid path template {template:?}: {source}")]
    Template {
        template: String,
        source: PatternError,
    },
    #[error("unknown placeholder kind {value:?} for {param:?} in {template:?}")]
    Placeholder {
        template: String,
        param: String,
        value: String,
    },
    #[error("scope {0} is not part of the route table")]
    UnknownScope(RouteId),
    #[error("no contract source configured")]
    MissingSource,
}

/// A route registered for one contract operation
#[derive(Debug, Clone)]
pub struct RouteBinding {
    pub route: RouteId,
    /// Full rendered pattern, e.g. `/api/pets/<id:num>`
    pub pattern: String,
    pub operation: Arc<OperationSpec>,
    pub name: Option<String>,
    /// True when an existing named route was moved under the scope
    pub reused: bool,
}

/// Result of synthesizing one contract
#[derive(Debug)]
pub struct Synthesis {
    pub scope: RouteId,
    pub introspection: RouteId,
    pub routes: Vec<RouteBinding>,
    pub contract: Arc<ContractModel>,
    pub orchestrator: Arc<ValidationOrchestrator>,
}

/// Builds contract routes into a [`RouteTable`]
pub struct RouteSynthesizer {
    config: PluginConfig,
    validator: Option<Arc<dyn SchemaValidator>>,
}

impl RouteSynthesizer {
    #[must_use]
    pub fn new(config: PluginConfig) -> Self {
        Self {
            config,
            validator: None,
        }
    }

    /// Use `validator` instead of a [`JsonSchemaValidator`] built from the contract.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    #[must_use]
    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Load the contract at `config.url` and synthesize it.
    pub fn register(&self, table: &mut RouteTable) -> Result<Synthesis, SynthesisError> {
        let source = self.config.url.as_deref().ok_or(SynthesisError::MissingSource)?;
        let contract = load_contract(source)?;
        self.synthesize(table, contract)
    }

    /// Synthesize the routes of `contract` into `table`.
    pub fn synthesize(
        &self,
        table: &mut RouteTable,
        mut contract: ContractModel,
    ) -> Result<Synthesis, SynthesisError> {
        let scope = self.resolve_scope(table, &contract)?;

        let rendered = table.render_path(scope)?;
        let base_path = match rendered.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        contract.set_base_path(base_path);

        let validator = match &self.validator {
            Some(v) => Arc::clone(v),
            None => Arc::new(JsonSchemaValidator::new(&contract, self.config.coerce)),
        };
        let orchestrator = Arc::new(ValidationOrchestrator::new(validator, self.config.log_level));
        let contract = Arc::new(contract);
        table.insert_metadata(scope, CONTRACT_KEY, Arc::clone(&contract))?;
        table.insert_metadata(scope, ORCHESTRATOR_KEY, Arc::clone(&orchestrator))?;

        let introspection = table.any(scope, "")?;
        table.via(introspection, [Method::GET])?;
        table.to(introspection, INTROSPECTION_HANDLER)?;

        let mut templates: Vec<&String> = contract.paths.keys().collect();
        templates.sort_by_key(|t| t.len());

        let mut routes = Vec::with_capacity(contract.operation_count());
        for template in templates {
            let Some(item) = contract.paths.get(template) else {
                continue;
            };
            for operation in item.operations.values() {
                let binding = bind_operation(table, scope, template, operation)?;
                debug!(
                    route = %binding.route,
                    method = %operation.method,
                    pattern = %binding.pattern,
                    route_name = binding.name.as_deref().unwrap_or(""),
                    reused = binding.reused,
                    "Operation route registered"
                );
                routes.push(binding);
            }
        }

        info!(
            routes_count = routes.len(),
            base_path = %contract.base_path,
            scope = %scope,
            "Contract routes synthesized"
        );

        Ok(Synthesis {
            scope,
            introspection,
            routes,
            contract,
            orchestrator,
        })
    }

    fn resolve_scope(
        &self,
        table: &mut RouteTable,
        contract: &ContractModel,
    ) -> Result<RouteId, SynthesisError> {
        match self.config.route {
            Some(scope) if !table.contains(scope) => Err(SynthesisError::UnknownScope(scope)),
            Some(scope) if table.pattern(scope)?.is_empty() => {
                Ok(table.any(scope, &contract.base_path)?)
            }
            Some(scope) => Ok(scope),
            None => Ok(table.any(table.root(), &contract.base_path)?),
        }
    }
}

fn placeholder_kinds(
    template: &str,
    operation: &OperationSpec,
) -> Result<HashMap<String, PlaceholderKind>, SynthesisError> {
    let mut kinds = HashMap::new();
    for param in operation.path_parameters() {
        let Some(value) = param.placeholder_kind() else {
            continue;
        };
        let kind = value
            .parse::<PlaceholderKind>()
            .map_err(|_| SynthesisError::Placeholder {
                template: template.to_string(),
                param: param.name.clone(),
                value: value.to_string(),
            })?;
        kinds.insert(param.name.clone(), kind);
    }
    Ok(kinds)
}

fn bind_operation(
    table: &mut RouteTable,
    scope: RouteId,
    template: &str,
    operation: &Arc<OperationSpec>,
) -> Result<RouteBinding, SynthesisError> {
    let name = operation.route_name().map(str::to_string);

    let existing = name.as_deref().and_then(|n| table.find(n));
    let (route, reused) = match existing {
        Some(route) => {
            table.reparent(route, scope)?;
            (route, true)
        }
        None => {
            let kinds = placeholder_kinds(template, operation)?;
            let pattern = RoutePattern::from_template(template, |param| {
                Ok(kinds.get(param).copied().unwrap_or_default())
            })
            .map_err(|source| SynthesisError::Template {
                template: template.to_string(),
                source,
            })?;
            let route = table.add(scope, pattern)?;
            table.via(route, [operation.method.clone()])?;
            if let Some(name) = &name {
                table.name(route, name)?;
            }
            (route, false)
        }
    };

    for arg in &operation.directive {
        match arg {
            DirectiveArg::Target(target) => table.to(route, target)?,
            DirectiveArg::Defaults(defaults) => table.merge_defaults(route, defaults)?,
        }
    }
    for param in operation.path_parameters() {
        if let Some(default) = param.default_value() {
            table.set_default(route, &param.name, default.clone())?;
        }
    }
    table.insert_metadata(route, OPERATION_KEY, Arc::clone(operation))?;

    Ok(RouteBinding {
        route,
        pattern: table.render_path(route)?,
        operation: Arc::clone(operation),
        name,
        reused,
    })
}
