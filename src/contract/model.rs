use super::ContractError;
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Prefix reserved for specification extensions.
pub const EXTENSION_PREFIX: &str = "x-";

/// Routing directive: handler binding applied to the synthesized route.
pub const ROUTE_TO_EXT: &str = "x-specroute-to";
/// Explicit route name, takes priority over `operationId`.
pub const ROUTE_NAME_EXT: &str = "x-specroute-name";
/// Placeholder kind of a path parameter (`standard`, `numeric`, `wildcard`).
pub const PLACEHOLDER_EXT: &str = "x-specroute-placeholder";

const METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Keywords of a Swagger 2.0 non-body parameter that describe its value.
const PARAMETER_SCHEMA_KEYS: [&str; 17] = [
    "type",
    "format",
    "items",
    "enum",
    "default",
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "minLength",
    "maxLength",
    "pattern",
    "minItems",
    "maxItems",
    "uniqueItems",
    "multipleOf",
    "const",
];

/// Returns `true` for keys using the reserved extension prefix.
#[inline]
#[must_use]
pub fn is_extension(key: &str) -> bool {
    key.starts_with(EXTENSION_PREFIX)
}

/// Contract dialect, which decides the JSON Schema draft used for validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Swagger2,
    OpenApi30,
    OpenApi31,
}

impl Dialect {
    fn detect(doc: &Value) -> Result<Self, ContractError> {
        if let Some(version) = doc.get("openapi").and_then(Value::as_str) {
            return Ok(if version.starts_with("3.0") {
                Dialect::OpenApi30
            } else {
                Dialect::OpenApi31
            });
        }
        match doc.get("swagger").and_then(Value::as_str) {
            Some("2.0") => Ok(Dialect::Swagger2),
            Some(other) => Err(ContractError::MetaInvalid(format!(
                "unsupported swagger version {other}"
            ))),
            None => Err(ContractError::MetaInvalid(
                "document declares neither `swagger` nor `openapi`".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
    Body,
    FormData,
}

impl std::fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => "cookie",
            ParameterLocation::Body => "body",
            ParameterLocation::FormData => "formData",
        };
        f.write_str(s)
    }
}

/// One declared operation parameter
#[derive(Debug, Clone, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(default)]
    pub required: bool,
    /// OpenAPI 3 / Swagger body schema. Swagger 2.0 non-body parameters keep
    /// their value keywords inline, see [`ParameterSpec::value_schema`].
    #[serde(default)]
    pub schema: Option<Value>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl ParameterSpec {
    /// JSON Schema the parameter value is validated against.
    #[must_use]
    pub fn value_schema(&self) -> Value {
        if let Some(schema) = &self.schema {
            return schema.clone();
        }
        let mut schema = Map::new();
        for key in PARAMETER_SCHEMA_KEYS {
            if let Some(v) = self.rest.get(key) {
                schema.insert(key.to_string(), v.clone());
            }
        }
        // `file` uploads are not described by a JSON type.
        if schema.get("type").and_then(Value::as_str) == Some("file") {
            schema.remove("type");
        }
        Value::Object(schema)
    }

    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.rest
            .get("default")
            .or_else(|| self.schema.as_ref().and_then(|s| s.get("default")))
    }

    /// Raw placeholder-kind extension value, if declared.
    #[must_use]
    pub fn placeholder_kind(&self) -> Option<&str> {
        self.rest.get(PLACEHOLDER_EXT).and_then(Value::as_str)
    }

    /// Delimiter used to split a serialized array value, or `None` when the
    /// array is sent as repeated keys.
    #[must_use]
    pub fn array_delimiter(&self) -> Option<char> {
        if let Some(format) = self.rest.get("collectionFormat").and_then(Value::as_str) {
            return match format {
                "ssv" => Some(' '),
                "tsv" => Some('\t'),
                "pipes" => Some('|'),
                "multi" => None,
                _ => Some(','),
            };
        }
        // Swagger 2.0 inline parameters default to `csv`.
        if self.schema.is_none() {
            return Some(',');
        }
        let explode = self.rest.get("explode").and_then(Value::as_bool);
        match self.rest.get("style").and_then(Value::as_str) {
            Some("spaceDelimited") => Some(' '),
            Some("pipeDelimited") => Some('|'),
            Some("form") | None
                if self.location == ParameterLocation::Query && explode != Some(false) =>
            {
                None
            }
            _ => Some(','),
        }
    }
}

/// Request body of an operation
#[derive(Debug, Clone, PartialEq)]
pub struct BodySpec {
    /// Name the validated body is bound under.
    pub name: String,
    pub required: bool,
    pub schema: Option<Value>,
}

/// Declared response for one status key
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResponseSpec {
    pub schema: Option<Value>,
    pub example: Option<Value>,
}

/// One entry of a routing directive
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveArg {
    /// `"handler"` or `"controller#action"`
    Target(String),
    /// Merged into the route defaults
    Defaults(Map<String, Value>),
}

impl DirectiveArg {
    fn parse(value: &Value, location: &str) -> Result<Self, ContractError> {
        match value {
            Value::String(s) => Ok(DirectiveArg::Target(s.clone())),
            Value::Object(map) => Ok(DirectiveArg::Defaults(map.clone())),
            other => Err(ContractError::InvalidDirective {
                location: location.to_string(),
                found: json_type(other),
            }),
        }
    }
}

fn parse_directive(value: &Value, location: &str) -> Result<Vec<DirectiveArg>, ContractError> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| DirectiveArg::parse(item, location))
            .collect(),
        single => Ok(vec![DirectiveArg::parse(single, location)?]),
    }
}

/// One method + path operation of the contract
#[derive(Debug, Clone)]
pub struct OperationSpec {
    pub method: Method,
    /// Path template as written in the contract (e.g. `/pets/{id}`)
    pub path: String,
    pub operation_id: Option<String>,
    /// Merged path-item and operation parameters, body excluded
    pub parameters: Vec<ParameterSpec>,
    pub body: Option<BodySpec>,
    pub responses: BTreeMap<String, ResponseSpec>,
    pub directive: Vec<DirectiveArg>,
    pub extensions: Map<String, Value>,
}

impl OperationSpec {
    /// Routing name: the name extension wins over `operationId`.
    #[must_use]
    pub fn route_name(&self) -> Option<&str> {
        self.extensions
            .get(ROUTE_NAME_EXT)
            .and_then(Value::as_str)
            .or(self.operation_id.as_deref())
    }

    pub fn path_parameters(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters
            .iter()
            .filter(|p| p.location == ParameterLocation::Path)
    }

    /// Declared response for `status`: exact code, then `2XX` class, then `default`.
    #[must_use]
    pub fn response_for(&self, status: u16) -> Option<&ResponseSpec> {
        let exact = status.to_string();
        let class = format!("{}XX", status / 100);
        self.responses
            .get(&exact)
            .or_else(|| {
                self.responses
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(&class))
                    .map(|(_, v)| v)
            })
            .or_else(|| self.responses.get("default"))
    }

    /// Stable label used in logs and validator cache keys.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Operations declared for one path template
#[derive(Debug, Clone, Default)]
pub struct PathItem {
    /// Lowercase method name → operation
    pub operations: BTreeMap<String, Arc<OperationSpec>>,
    pub extensions: Map<String, Value>,
}

/// Parsed, meta-valid API contract
///
/// Built once at startup from the loaded document and immutable once shared
/// with the route table. The raw document is kept for introspection.
#[derive(Debug, Clone)]
pub struct ContractModel {
    pub base_path: String,
    pub paths: BTreeMap<String, PathItem>,
    pub dialect: Dialect,
    document: Value,
}

impl ContractModel {
    /// Build the model from an already meta-validated document.
    pub fn from_document(document: Value) -> Result<Self, ContractError> {
        let dialect = Dialect::detect(&document)?;
        let base_path = extract_base_path(&document, dialect);

        let mut paths = BTreeMap::new();
        if let Some(paths_map) = document.get("paths").and_then(Value::as_object) {
            for (template, item) in paths_map {
                if is_extension(template) {
                    continue;
                }
                let item = build_path_item(&document, dialect, template, item)?;
                paths.insert(template.clone(), item);
            }
        }

        Ok(Self {
            base_path,
            paths,
            dialect,
            document,
        })
    }

    /// The document as loaded.
    #[must_use]
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Record the mounted base path on the model and the document.
    pub fn set_base_path(&mut self, base_path: &str) {
        self.base_path = base_path.to_string();
        if self.dialect == Dialect::Swagger2 {
            if let Value::Object(doc) = &mut self.document {
                doc.insert("basePath".to_string(), Value::String(base_path.to_string()));
            }
        }
    }

    /// Number of operations across all path templates.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.paths.values().map(|p| p.operations.len()).sum()
    }

    /// Lookup by template and lowercase method.
    #[must_use]
    pub fn operation(&self, template: &str, method: &str) -> Option<&Arc<OperationSpec>> {
        self.paths
            .get(template)
            .and_then(|item| item.operations.get(&method.to_ascii_lowercase()))
    }
}

fn extract_base_path(doc: &Value, dialect: Dialect) -> String {
    let raw = match dialect {
        Dialect::Swagger2 => doc
            .get("basePath")
            .and_then(Value::as_str)
            .unwrap_or("/")
            .to_string(),
        Dialect::OpenApi30 | Dialect::OpenApi31 => doc
            .pointer("/servers/0/url")
            .and_then(Value::as_str)
            .map(|url_str| {
                url::Url::parse(url_str)
                    .or_else(|_| url::Url::parse(&format!("http://dummy{url_str}")))
                    .map(|u| u.path().to_string())
                    .unwrap_or_default()
            })
            .unwrap_or_default(),
    };
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Follow a local `$ref` (only JSON pointers into the same document).
fn deref<'a>(doc: &'a Value, value: &'a Value) -> Result<&'a Value, ContractError> {
    let mut current = value;
    // Bounded to break reference cycles.
    for _ in 0..16 {
        match current.get("$ref").and_then(Value::as_str) {
            Some(reference) => {
                let pointer = reference
                    .strip_prefix('#')
                    .ok_or_else(|| ContractError::UnresolvedRef(reference.to_string()))?;
                current = doc
                    .pointer(pointer)
                    .ok_or_else(|| ContractError::UnresolvedRef(reference.to_string()))?;
            }
            None => return Ok(current),
        }
    }
    Err(ContractError::UnresolvedRef(
        value
            .get("$ref")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    ))
}

fn parse_parameters(
    doc: &Value,
    list: Option<&Value>,
    location: &str,
) -> Result<Vec<ParameterSpec>, ContractError> {
    let Some(list) = list.and_then(Value::as_array) else {
        return Ok(Vec::new());
    };
    list.iter()
        .map(|p| {
            let resolved = deref(doc, p)?;
            serde_json::from_value(resolved.clone()).map_err(|source| {
                ContractError::InvalidParameter {
                    location: location.to_string(),
                    source,
                }
            })
        })
        .collect()
}

/// Operation parameters override path-item parameters with the same name and location.
fn merge_parameters(shared: &[ParameterSpec], own: Vec<ParameterSpec>) -> Vec<ParameterSpec> {
    let mut merged: Vec<ParameterSpec> = shared
        .iter()
        .filter(|s| {
            !own.iter()
                .any(|o| o.name == s.name && o.location == s.location)
        })
        .cloned()
        .collect();
    merged.extend(own);
    merged
}

fn json_media<'a>(content: Option<&'a Value>) -> Option<&'a Value> {
    let content = content?.as_object()?;
    content
        .get("application/json")
        .or_else(|| content.iter().find(|(k, _)| k.contains("json")).map(|(_, v)| v))
        .or_else(|| content.values().next())
}

fn parse_request_body(
    doc: &Value,
    dialect: Dialect,
    operation: &Value,
    parameters: &mut Vec<ParameterSpec>,
) -> Result<Option<BodySpec>, ContractError> {
    if let Some(index) = parameters
        .iter()
        .position(|p| p.location == ParameterLocation::Body)
    {
        let param = parameters.remove(index);
        return Ok(Some(BodySpec {
            name: param.name,
            required: param.required,
            schema: param.schema,
        }));
    }
    if dialect == Dialect::Swagger2 {
        return Ok(None);
    }
    let Some(body) = operation.get("requestBody") else {
        return Ok(None);
    };
    let body = deref(doc, body)?;
    Ok(Some(BodySpec {
        name: "body".to_string(),
        required: body.get("required").and_then(Value::as_bool).unwrap_or(false),
        schema: json_media(body.get("content")).and_then(|m| m.get("schema").cloned()),
    }))
}

fn parse_responses(
    doc: &Value,
    dialect: Dialect,
    operation: &Value,
) -> Result<BTreeMap<String, ResponseSpec>, ContractError> {
    let mut out = BTreeMap::new();
    let Some(responses) = operation.get("responses").and_then(Value::as_object) else {
        return Ok(out);
    };
    for (status, response) in responses {
        if is_extension(status) {
            continue;
        }
        let response = deref(doc, response)?;
        let spec = match dialect {
            Dialect::Swagger2 => ResponseSpec {
                schema: response.get("schema").cloned(),
                example: response
                    .pointer("/examples/application~1json")
                    .cloned(),
            },
            Dialect::OpenApi30 | Dialect::OpenApi31 => {
                let media = json_media(response.get("content"));
                ResponseSpec {
                    schema: media.and_then(|m| m.get("schema").cloned()),
                    example: media.and_then(|m| {
                        m.get("example").cloned().or_else(|| {
                            m.get("examples")
                                .and_then(Value::as_object)
                                .and_then(|e| e.values().find_map(|x| x.get("value").cloned()))
                        })
                    }),
                }
            }
        };
        out.insert(status.clone(), spec);
    }
    Ok(out)
}

fn build_path_item(
    doc: &Value,
    dialect: Dialect,
    template: &str,
    item: &Value,
) -> Result<PathItem, ContractError> {
    let item = deref(doc, item)?;
    let Some(obj) = item.as_object() else {
        return Err(ContractError::MetaInvalid(format!(
            "path item {template} is not an object"
        )));
    };
    let shared = parse_parameters(doc, obj.get("parameters"), template)?;
    let mut path_item = PathItem::default();

    for (key, value) in obj {
        if is_extension(key) {
            path_item.extensions.insert(key.clone(), value.clone());
            continue;
        }
        let method_key = key.to_ascii_lowercase();
        if !METHODS.contains(&method_key.as_str()) {
            continue;
        }
        let location = format!("{template} → {method_key}");
        let method = Method::from_bytes(method_key.to_ascii_uppercase().as_bytes())
            .map_err(|_| ContractError::MetaInvalid(format!("invalid method at {location}")))?;

        let own = parse_parameters(doc, value.get("parameters"), &location)?;
        let mut parameters = merge_parameters(&shared, own);
        let body = parse_request_body(doc, dialect, value, &mut parameters)?;
        let responses = parse_responses(doc, dialect, value)?;

        let extensions: Map<String, Value> = value
            .as_object()
            .map(|o| {
                o.iter()
                    .filter(|(k, _)| is_extension(k))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();
        let directive = match extensions.get(ROUTE_TO_EXT) {
            Some(v) => parse_directive(v, &location)?,
            None => Vec::new(),
        };

        path_item.operations.insert(
            method_key,
            Arc::new(OperationSpec {
                method,
                path: template.to_string(),
                operation_id: value
                    .get("operationId")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                parameters,
                body,
                responses,
                directive,
                extensions,
            }),
        );
    }
    Ok(path_item)
}
