//! Compiled matcher over a frozen [`RouteTable`].

use super::pattern::Part;
use super::table::{RouteError, RouteId, RouteTable};
use http::Method;
use regex::Regex;
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, info};

/// Maximum number of path parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Captured path parameters, in pattern order
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// One matchable leaf route
#[derive(Debug)]
pub struct Endpoint {
    pub route: RouteId,
    pub name: Option<String>,
    /// Allowed methods; empty allows every method
    pub methods: Vec<Method>,
    /// Full path in router syntax
    pub path: String,
    /// Defaults inherited from every ancestor, nearest wins
    pub defaults: Map<String, Value>,
    regex: Regex,
    param_names: Vec<Arc<str>>,
}

impl Endpoint {
    #[must_use]
    pub fn allows(&self, method: &Method) -> bool {
        self.methods.is_empty() || self.methods.contains(method)
    }
}

/// Result of matching a request against the router
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub endpoint: Arc<Endpoint>,
    pub path_params: ParamVec,
    /// Captures layered over the endpoint defaults
    pub params: Map<String, Value>,
}

impl RouteMatch {
    #[must_use]
    pub fn route(&self) -> RouteId {
        self.endpoint.route
    }

    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Router matching requests against the leaf routes of a route table
///
/// Endpoints are tried in depth-first registration order; the first one whose
/// method set and regex both accept the request wins.
pub struct Router {
    table: RouteTable,
    endpoints: Vec<Arc<Endpoint>>,
}

impl Router {
    /// Freeze `table` and compile every leaf route.
    ///
    /// # Errors
    ///
    /// Fails when a route id is dangling or a compiled regex is rejected.
    pub fn new(table: RouteTable) -> Result<Self, RouteError> {
        let mut endpoints = Vec::new();
        let mut stack = vec![table.root()];
        while let Some(id) = stack.pop() {
            let children = table.children(id)?;
            if children.is_empty() {
                if id != table.root() {
                    endpoints.push(Arc::new(compile_endpoint(&table, id)?));
                }
                continue;
            }
            stack.extend(children.iter().rev().copied());
        }

        info!(routes_count = endpoints.len(), "Routing table loaded");
        Ok(Self { table, endpoints })
    }

    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    #[must_use]
    pub fn endpoints(&self) -> &[Arc<Endpoint>] {
        &self.endpoints
    }

    /// Match a request. Trailing slashes on `path` are ignored.
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let path = path.trim_end_matches('/');
        for endpoint in &self.endpoints {
            if !endpoint.allows(method) {
                continue;
            }
            let Some(caps) = endpoint.regex.captures(path) else {
                continue;
            };
            let mut path_params = ParamVec::new();
            let mut params = endpoint.defaults.clone();
            for (i, name) in endpoint.param_names.iter().enumerate() {
                if let Some(m) = caps.get(i + 1) {
                    let value = decode_capture(m.as_str());
                    params.insert(name.to_string(), Value::String(value.clone()));
                    path_params.push((Arc::clone(name), value));
                }
            }
            debug!(
                method = %method,
                path = %path,
                route = %endpoint.path,
                path_params = ?path_params,
                "Route matched"
            );
            return Some(RouteMatch {
                endpoint: Arc::clone(endpoint),
                path_params,
                params,
            });
        }
        debug!(method = %method, path = %path, "No route matched");
        None
    }

    /// Print all endpoints to stdout.
    pub fn dump_routes(&self) {
        println!("[routes] count={}", self.endpoints.len());
        for endpoint in &self.endpoints {
            let methods = if endpoint.methods.is_empty() {
                "*".to_string()
            } else {
                endpoint
                    .methods
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(",")
            };
            let path = if endpoint.path.is_empty() {
                "/"
            } else {
                endpoint.path.as_str()
            };
            println!(
                "[route] {methods} {path} -> {}",
                endpoint.name.as_deref().unwrap_or("-")
            );
        }
    }
}

/// Percent-decode a captured segment. Captures are taken before decoding, so
/// an encoded `/` never splits a segment. Invalid UTF-8 keeps the raw text.
fn decode_capture(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

fn compile_endpoint(table: &RouteTable, id: RouteId) -> Result<Endpoint, RouteError> {
    let ancestry = table.ancestry(id)?;
    let mut parts: Vec<&Part> = Vec::new();
    let mut defaults = Map::new();
    for route in &ancestry {
        parts.extend(table.pattern(*route)?.parts());
        for (k, v) in table.defaults(*route)? {
            defaults.insert(k.clone(), v.clone());
        }
    }

    // A trailing `/<name>` whose name has a default may be omitted.
    let optional_tail = match parts.as_slice() {
        [.., Part::Literal(prefix), Part::Placeholder { name, .. }] => {
            prefix.ends_with('/') && defaults.contains_key(name)
        }
        _ => false,
    };

    let mut pattern = String::with_capacity(64);
    pattern.push('^');
    let mut param_names = Vec::new();
    let last = parts.len().saturating_sub(1);
    for (i, part) in parts.iter().enumerate() {
        match part {
            Part::Literal(s) if optional_tail && i + 1 == last => {
                pattern.push_str(&regex::escape(&s[..s.len() - 1]));
            }
            Part::Literal(s) => pattern.push_str(&regex::escape(s)),
            Part::Placeholder { name, kind } if optional_tail && i == last => {
                pattern.push_str("(?:/(");
                pattern.push_str(kind.regex());
                pattern.push_str("))?");
                param_names.push(Arc::from(name.as_str()));
            }
            Part::Placeholder { name, kind } => {
                pattern.push('(');
                pattern.push_str(kind.regex());
                pattern.push(')');
                param_names.push(Arc::from(name.as_str()));
            }
        }
    }
    pattern.push('$');

    let path = table.render_path(id)?;
    let regex = Regex::new(&pattern).map_err(|source| RouteError::Regex {
        path: path.clone(),
        source,
    })?;
    Ok(Endpoint {
        route: id,
        name: table.route_name(id)?.map(str::to_string),
        methods: table.methods(id)?.to_vec(),
        path,
        defaults,
        regex,
        param_names,
    })
}
