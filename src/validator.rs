//! # Validator Module
//!
//! Schema validation of requests and responses against the operations of a
//! [`ContractModel`].
//!
//! ## Overview
//!
//! [`SchemaValidator`] is the seam the orchestrator talks to. The default
//! implementation, [`JsonSchemaValidator`], is backed by the `jsonschema` crate:
//!
//! - Parameters are read from their declared location (path, query, header,
//!   cookie, form), optionally coerced from strings to the schema type, and
//!   validated one by one.
//! - The request body is validated against the body schema.
//! - Responses are validated against the rule declared for their status.
//!
//! Every violation is collected; a validation call only fails structurally when a
//! schema cannot be compiled.
//!
//! ## Error paths
//!
//! | Violation | Path |
//! |-----------|------|
//! | missing parameter `age` | `/age` |
//! | invalid parameter `age` | `/age` + instance pointer |
//! | missing or invalid body | `/body` + instance pointer |
//! | undeclared response status | `/` |
//!
//! ## Schema compilation
//!
//! Swagger 2.0 and OpenAPI 3.0 schemas are compiled as draft 4, OpenAPI 3.1 as
//! draft 2020-12. The `definitions` and `components` sections of the contract are
//! embedded next to each schema so local `$ref`s resolve. Compiled validators are
//! cached per operation slot behind an `RwLock`.

use crate::contract::{ContractModel, Dialect, OperationSpec, ParameterLocation, ParameterSpec};
use jsonschema::{Draft, Validator};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Message used for every missing required input.
pub const MISSING_PROPERTY: &str = "Missing property.";

/// One violation: where it happened and what went wrong
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Ordered violations of one validation call. Empty means success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationOutcome {
    errors: Vec<ValidationError>,
}

impl ValidationOutcome {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl From<Vec<ValidationError>> for ValidationOutcome {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }
}

/// Result of validating a request: the outcome plus the bound values
#[derive(Debug, Clone, Default)]
pub struct RequestValidation {
    pub outcome: ValidationOutcome,
    /// Validated (and possibly coerced) values by parameter name; the body is
    /// bound under its declared name.
    pub values: Map<String, Value>,
}

/// Borrowed view of the request inputs a validator reads
#[derive(Debug, Clone, Copy)]
pub struct RequestInput<'a> {
    pub path_params: &'a [(Arc<str>, String)],
    pub query: &'a [(String, String)],
    /// Keys are lowercase
    pub headers: &'a HashMap<String, String>,
    pub cookies: &'a HashMap<String, String>,
    pub form: &'a [(String, String)],
    pub body: Option<&'a Value>,
}

/// Structural failure of the validator itself
#[derive(Debug, thiserror::Error)]
pub enum ValidatorError {
    #[error("invalid schema for {slot}: {message}")]
    Schema { slot: String, message: String },
}

/// Validates requests and responses against contract operations.
pub trait SchemaValidator: Send + Sync {
    fn validate_request(
        &self,
        operation: &OperationSpec,
        input: &RequestInput<'_>,
    ) -> Result<RequestValidation, ValidatorError>;

    fn validate_response(
        &self,
        operation: &OperationSpec,
        status: u16,
        payload: &Value,
    ) -> Result<ValidationOutcome, ValidatorError>;
}

/// [`SchemaValidator`] backed by the `jsonschema` crate
pub struct JsonSchemaValidator {
    coerce: bool,
    draft: Draft,
    definitions: Option<Value>,
    components: Option<Value>,
    cache: RwLock<HashMap<String, Arc<Validator>>>,
}

impl std::fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchemaValidator")
            .field("coerce", &self.coerce)
            .field("draft", &self.draft)
            .finish_non_exhaustive()
    }
}

impl JsonSchemaValidator {
    /// Build a validator for `contract`. With `coerce` set, string inputs are
    /// converted to the declared schema type before validation.
    #[must_use]
    pub fn new(contract: &ContractModel, coerce: bool) -> Self {
        let draft = match contract.dialect {
            Dialect::Swagger2 | Dialect::OpenApi30 => Draft::Draft4,
            Dialect::OpenApi31 => Draft::Draft202012,
        };
        let doc = contract.document();
        Self {
            coerce,
            draft,
            definitions: doc.get("definitions").cloned(),
            components: doc.get("components").cloned(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Number of compiled validators currently cached.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn compiled(&self, slot: String, schema: &Value) -> Result<Arc<Validator>, ValidatorError> {
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(validator) = cache.get(&slot) {
                return Ok(Arc::clone(validator));
            }
        }

        let mut wrapped = Map::new();
        wrapped.insert("allOf".to_string(), Value::Array(vec![schema.clone()]));
        if let Some(definitions) = &self.definitions {
            wrapped.insert("definitions".to_string(), definitions.clone());
        }
        if let Some(components) = &self.components {
            wrapped.insert("components".to_string(), components.clone());
        }
        let validator = jsonschema::options()
            .with_draft(self.draft)
            .build(&Value::Object(wrapped))
            .map_err(|err| ValidatorError::Schema {
                slot: slot.clone(),
                message: err.to_string(),
            })?;
        let validator = Arc::new(validator);

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let cached = Arc::clone(cache.entry(slot).or_insert(validator));
        debug!(cache_size = cache.len(), "Schema validator compiled and cached");
        Ok(cached)
    }

    fn check(
        &self,
        slot: String,
        schema: &Value,
        instance: &Value,
        prefix: &str,
        outcome: &mut ValidationOutcome,
    ) -> Result<(), ValidatorError> {
        if is_empty_schema(schema) {
            return Ok(());
        }
        let validator = self.compiled(slot, schema)?;
        for err in validator.iter_errors(instance) {
            outcome.push(ValidationError::new(
                format!("{prefix}{}", err.instance_path()),
                err.to_string(),
            ));
        }
        Ok(())
    }

    fn decode(&self, raw: &[&str], param: &ParameterSpec, schema: &Value) -> Value {
        if self.coerce {
            coerce_value(raw, schema, param.array_delimiter())
        } else if raw.len() > 1 {
            Value::Array(raw.iter().map(|s| Value::String((*s).to_string())).collect())
        } else {
            Value::String(raw.last().copied().unwrap_or_default().to_string())
        }
    }
}

fn is_empty_schema(schema: &Value) -> bool {
    schema.as_object().is_some_and(Map::is_empty)
}

/// Raw values of `param` in the request, in arrival order.
fn raw_values<'a>(param: &ParameterSpec, input: &RequestInput<'a>) -> Vec<&'a str> {
    let name = param.name.as_str();
    match param.location {
        ParameterLocation::Path => input
            .path_params
            .iter()
            .filter(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
            .collect(),
        ParameterLocation::Query => input
            .query
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect(),
        ParameterLocation::FormData => input
            .form
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect(),
        ParameterLocation::Header => input
            .headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
            .into_iter()
            .collect(),
        ParameterLocation::Cookie => input
            .cookies
            .get(name)
            .map(String::as_str)
            .into_iter()
            .collect(),
        ParameterLocation::Body => Vec::new(),
    }
}

fn schema_type(schema: &Value) -> Option<&str> {
    match schema.get("type")? {
        Value::String(ty) => Some(ty),
        Value::Array(types) => types.iter().filter_map(Value::as_str).find(|t| *t != "null"),
        _ => None,
    }
}

fn convert_primitive(val: &str, schema: Option<&Value>) -> Value {
    match schema.and_then(schema_type) {
        Some("integer") => val
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(val.to_string())),
        Some("number") => val
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map_or_else(|| Value::String(val.to_string()), Value::Number),
        Some("boolean") => val
            .parse::<bool>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(val.to_string())),
        Some("object") => {
            serde_json::from_str(val).unwrap_or_else(|_| Value::String(val.to_string()))
        }
        _ => Value::String(val.to_string()),
    }
}

/// Convert raw string inputs to the type declared by `schema`. Values that do
/// not convert stay strings so that validation reports them.
fn coerce_value(raw: &[&str], schema: &Value, delimiter: Option<char>) -> Value {
    if schema_type(schema) == Some("array") {
        let items = schema.get("items");
        let parts: Vec<&str> = match (raw, delimiter) {
            ([single], Some(delim)) => single.split(delim).filter(|s| !s.is_empty()).collect(),
            _ => raw.to_vec(),
        };
        return Value::Array(
            parts
                .into_iter()
                .map(|p| convert_primitive(p.trim(), items))
                .collect(),
        );
    }
    convert_primitive(raw.last().copied().unwrap_or_default(), Some(schema))
}

fn slot(operation: &OperationSpec, what: &str) -> String {
    format!("{}:{what}", operation.label())
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate_request(
        &self,
        operation: &OperationSpec,
        input: &RequestInput<'_>,
    ) -> Result<RequestValidation, ValidatorError> {
        let mut result = RequestValidation::default();

        for param in &operation.parameters {
            let raw = raw_values(param, input);
            if raw.is_empty() {
                if param.required {
                    result
                        .outcome
                        .push(ValidationError::new(format!("/{}", param.name), MISSING_PROPERTY));
                } else if let Some(default) = param.default_value() {
                    result.values.insert(param.name.clone(), default.clone());
                }
                continue;
            }
            let schema = param.value_schema();
            let value = self.decode(&raw, param, &schema);
            self.check(
                slot(operation, &format!("{}:{}", param.location, param.name)),
                &schema,
                &value,
                &format!("/{}", param.name),
                &mut result.outcome,
            )?;
            result.values.insert(param.name.clone(), value);
        }

        if let Some(body) = &operation.body {
            match input.body.filter(|b| !b.is_null()) {
                None if body.required => {
                    result
                        .outcome
                        .push(ValidationError::new("/body", MISSING_PROPERTY));
                }
                None => {}
                Some(payload) => {
                    if let Some(schema) = &body.schema {
                        self.check(
                            slot(operation, "body"),
                            schema,
                            payload,
                            "/body",
                            &mut result.outcome,
                        )?;
                    }
                    result.values.insert(body.name.clone(), payload.clone());
                }
            }
        }

        Ok(result)
    }

    fn validate_response(
        &self,
        operation: &OperationSpec,
        status: u16,
        payload: &Value,
    ) -> Result<ValidationOutcome, ValidatorError> {
        let mut outcome = ValidationOutcome::default();
        let Some(rule) = operation.response_for(status) else {
            outcome.push(ValidationError::new(
                "/",
                format!("No responses rules defined for status {status}."),
            ));
            return Ok(outcome);
        };
        if let Some(schema) = &rule.schema {
            self.check(
                slot(operation, &format!("response:{status}")),
                schema,
                payload,
                "/body",
                &mut outcome,
            )?;
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn contract() -> ContractModel {
        ContractModel::from_document(json!({
            "swagger": "2.0",
            "info": {"title": "t", "version": "1"},
            "definitions": {
                "Pet": {"type": "object", "required": ["name"],
                        "properties": {"name": {"type": "string"}, "age": {"type": "integer"}}}
            },
            "paths": {
                "/pets/{id}": {
                    "post": {
                        "parameters": [
                            {"name": "id", "in": "path", "required": true, "type": "integer"},
                            {"name": "tags", "in": "query", "type": "array",
                             "items": {"type": "string"}, "collectionFormat": "pipes"},
                            {"name": "limit", "in": "query", "type": "integer", "default": 20},
                            {"name": "X-Trace", "in": "header", "required": true, "type": "string"},
                            {"name": "pet", "in": "body", "required": true,
                             "schema": {"$ref": "#/definitions/Pet"}}
                        ],
                        "responses": {
                            "201": {"description": "ok", "schema": {"$ref": "#/definitions/Pet"}},
                            "204": {"description": "empty"}
                        }
                    }
                }
            }
        }))
        .unwrap()
    }

    struct Inputs {
        path: Vec<(Arc<str>, String)>,
        query: Vec<(String, String)>,
        headers: HashMap<String, String>,
        cookies: HashMap<String, String>,
        form: Vec<(String, String)>,
    }

    impl Inputs {
        fn new(id: &str) -> Self {
            Self {
                path: vec![(Arc::from("id"), id.to_string())],
                query: vec![("tags".into(), "a|b".into())],
                headers: HashMap::from([("x-trace".to_string(), "abc".to_string())]),
                cookies: HashMap::new(),
                form: Vec::new(),
            }
        }

        fn input<'a>(&'a self, body: Option<&'a Value>) -> RequestInput<'a> {
            RequestInput {
                path_params: &self.path,
                query: &self.query,
                headers: &self.headers,
                cookies: &self.cookies,
                form: &self.form,
                body,
            }
        }
    }

    #[test]
    fn test_valid_request_binds_coerced_values() {
        let contract = contract();
        let op = contract.operation("/pets/{id}", "post").unwrap();
        let validator = JsonSchemaValidator::new(&contract, true);
        let inputs = Inputs::new("7");
        let body = json!({"name": "Rex"});

        let result = validator.validate_request(op, &inputs.input(Some(&body))).unwrap();
        assert!(result.outcome.is_valid(), "{:?}", result.outcome);
        assert_eq!(result.values["id"], json!(7));
        assert_eq!(result.values["tags"], json!(["a", "b"]));
        assert_eq!(result.values["limit"], json!(20));
        assert_eq!(result.values["X-Trace"], json!("abc"));
        assert_eq!(result.values["pet"], body);
        assert!(validator.cached() > 0);
    }

    #[test]
    fn test_every_violation_is_reported() {
        let contract = contract();
        let op = contract.operation("/pets/{id}", "post").unwrap();
        let validator = JsonSchemaValidator::new(&contract, true);
        let mut inputs = Inputs::new("seven");
        inputs.headers.clear();
        let body = json!({"age": "old"});

        let result = validator.validate_request(op, &inputs.input(Some(&body))).unwrap();
        let paths: Vec<&str> = result.outcome.errors().iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"/id"), "{paths:?}");
        assert!(paths.contains(&"/X-Trace"), "{paths:?}");
        assert!(paths.contains(&"/body"), "{paths:?}");
        assert!(paths.contains(&"/body/age"), "{paths:?}");
        let missing = result
            .outcome
            .errors()
            .iter()
            .find(|e| e.path == "/X-Trace")
            .unwrap();
        assert_eq!(missing.message, MISSING_PROPERTY);
    }

    #[test]
    fn test_missing_required_body() {
        let contract = contract();
        let op = contract.operation("/pets/{id}", "post").unwrap();
        let validator = JsonSchemaValidator::new(&contract, true);
        let inputs = Inputs::new("1");

        let result = validator.validate_request(op, &inputs.input(None)).unwrap();
        assert_eq!(
            result.outcome.errors(),
            &[ValidationError::new("/body", MISSING_PROPERTY)]
        );
    }

    #[test]
    fn test_without_coercion_integers_fail() {
        let contract = contract();
        let op = contract.operation("/pets/{id}", "post").unwrap();
        let validator = JsonSchemaValidator::new(&contract, false);
        let inputs = Inputs::new("7");
        let body = json!({"name": "Rex"});

        let result = validator.validate_request(op, &inputs.input(Some(&body))).unwrap();
        assert!(result.outcome.errors().iter().any(|e| e.path == "/id"));
    }

    #[test]
    fn test_response_rules() {
        let contract = contract();
        let op = contract.operation("/pets/{id}", "post").unwrap();
        let validator = JsonSchemaValidator::new(&contract, true);

        assert!(validator
            .validate_response(op, 201, &json!({"name": "Rex"}))
            .unwrap()
            .is_valid());
        assert!(validator.validate_response(op, 204, &json!(null)).unwrap().is_valid());

        let invalid = validator.validate_response(op, 201, &json!([])).unwrap();
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid.errors()[0].path, "/body");

        let undeclared = validator.validate_response(op, 500, &json!({})).unwrap();
        assert_eq!(
            undeclared.errors(),
            &[ValidationError::new("/", "No responses rules defined for status 500.")]
        );
    }

    #[test]
    fn test_empty_responses_declare_no_status() {
        let contract = ContractModel::from_document(json!({
            "swagger": "2.0",
            "info": {"title": "t", "version": "1"},
            "paths": {"/bare": {"get": {"operationId": "bare", "responses": {}}}}
        }))
        .unwrap();
        let op = contract.operation("/bare", "get").unwrap();
        let validator = JsonSchemaValidator::new(&contract, true);

        let outcome = validator.validate_response(op, 200, &json!("anything")).unwrap();
        assert_eq!(
            outcome.errors(),
            &[ValidationError::new("/", "No responses rules defined for status 200.")]
        );
    }

    #[test]
    fn test_coerce_value() {
        let schema = json!({"type": "array", "items": {"type": "integer"}});
        assert_eq!(coerce_value(&["1,2,3"], &schema, Some(',')), json!([1, 2, 3]));
        assert_eq!(coerce_value(&["1", "2"], &schema, None), json!([1, 2]));
        assert_eq!(coerce_value(&["true"], &json!({"type": "boolean"}), None), json!(true));
        assert_eq!(coerce_value(&["1.5"], &json!({"type": "number"}), None), json!(1.5));
        assert_eq!(
            coerce_value(&[r#"{"a":1}"#], &json!({"type": "object"}), None),
            json!({"a": 1})
        );
        assert_eq!(coerce_value(&["x"], &json!({"type": "integer"}), None), json!("x"));
    }
}
