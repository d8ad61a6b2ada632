use super::pattern::{PatternError, RoutePattern};
use http::Method;
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Stable handle of a route in a [`RouteTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(usize);

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type-erased per-route metadata value
pub type Metadata = Arc<dyn Any + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error("route {0} is not part of this table")]
    UnknownRoute(RouteId),
    #[error("moving route {route} under {parent} would create a cycle")]
    Cycle { route: RouteId, parent: RouteId },
    #[error("the root route cannot be moved")]
    MoveRoot,
    #[error("failed to compile route {path}: {source}")]
    Regex { path: String, source: regex::Error },
}

struct RouteNode {
    pattern: RoutePattern,
    parent: Option<RouteId>,
    children: Vec<RouteId>,
    methods: Vec<Method>,
    name: Option<String>,
    defaults: Map<String, Value>,
    metadata: HashMap<&'static str, Metadata>,
}

impl RouteNode {
    fn new(pattern: RoutePattern, parent: Option<RouteId>) -> Self {
        Self {
            pattern,
            parent,
            children: Vec::new(),
            methods: Vec::new(),
            name: None,
            defaults: Map::new(),
            metadata: HashMap::new(),
        }
    }
}

/// Mutable route tree, populated at startup and frozen into a
/// [`Router`](super::Router).
///
/// Routes live in an arena and are addressed by [`RouteId`]; re-parenting moves
/// a route together with its whole subtree. The root has an empty pattern.
pub struct RouteTable {
    nodes: Vec<RouteNode>,
    names: HashMap<String, RouteId>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.nodes.len())
            .field("names", &self.names.len())
            .finish()
    }
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![RouteNode::new(RoutePattern::default(), None)],
            names: HashMap::new(),
        }
    }

    #[must_use]
    pub fn root(&self) -> RouteId {
        RouteId(0)
    }

    #[must_use]
    pub fn contains(&self, id: RouteId) -> bool {
        id.0 < self.nodes.len()
    }

    /// Number of routes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    fn node(&self, id: RouteId) -> Result<&RouteNode, RouteError> {
        self.nodes.get(id.0).ok_or(RouteError::UnknownRoute(id))
    }

    fn node_mut(&mut self, id: RouteId) -> Result<&mut RouteNode, RouteError> {
        self.nodes.get_mut(id.0).ok_or(RouteError::UnknownRoute(id))
    }

    /// Add a child route matching any method, parsing `pattern` in router syntax.
    pub fn any(&mut self, parent: RouteId, pattern: &str) -> Result<RouteId, RouteError> {
        let pattern = RoutePattern::parse(pattern)?;
        self.add(parent, pattern)
    }

    /// Add a child route with an already compiled pattern.
    pub fn add(&mut self, parent: RouteId, pattern: RoutePattern) -> Result<RouteId, RouteError> {
        self.node(parent)?;
        let id = RouteId(self.nodes.len());
        self.nodes.push(RouteNode::new(pattern, Some(parent)));
        self.node_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Restrict a route to the given methods. An empty set allows every method.
    pub fn via<I>(&mut self, id: RouteId, methods: I) -> Result<(), RouteError>
    where
        I: IntoIterator<Item = Method>,
    {
        let node = self.node_mut(id)?;
        for method in methods {
            if !node.methods.contains(&method) {
                node.methods.push(method);
            }
        }
        Ok(())
    }

    /// Name a route. When the name is already taken, the newest route wins.
    pub fn name(&mut self, id: RouteId, name: &str) -> Result<(), RouteError> {
        self.node(id)?;
        if let Some(previous) = self.names.get(name).copied() {
            if previous != id {
                warn!(name = %name, previous = %previous, route = %id, "Route name reassigned");
                self.node_mut(previous)?.name = None;
            }
        }
        let node = self.node_mut(id)?;
        if let Some(old) = node.name.replace(name.to_string()) {
            if old != name {
                self.names.remove(&old);
            }
        }
        self.names.insert(name.to_string(), id);
        Ok(())
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<RouteId> {
        self.names.get(name).copied()
    }

    /// Move `id` and its subtree under `parent`. Moving a route under its
    /// current parent changes nothing.
    pub fn reparent(&mut self, id: RouteId, parent: RouteId) -> Result<(), RouteError> {
        self.node(parent)?;
        let current = self.node(id)?.parent.ok_or(RouteError::MoveRoot)?;
        if current == parent {
            return Ok(());
        }
        if self.ancestry(parent)?.contains(&id) {
            return Err(RouteError::Cycle { route: id, parent });
        }
        self.node_mut(current)?.children.retain(|c| *c != id);
        self.node_mut(parent)?.children.push(id);
        self.node_mut(id)?.parent = Some(parent);
        Ok(())
    }

    /// Bind a handler target: `controller#action` sets both defaults,
    /// anything else sets `handler`.
    pub fn to(&mut self, id: RouteId, target: &str) -> Result<(), RouteError> {
        let node = self.node_mut(id)?;
        match target.split_once('#') {
            Some((controller, action)) => {
                if !controller.is_empty() {
                    node.defaults
                        .insert("controller".to_string(), Value::String(controller.to_string()));
                }
                if !action.is_empty() {
                    node.defaults
                        .insert("action".to_string(), Value::String(action.to_string()));
                }
            }
            None => {
                node.defaults
                    .insert("handler".to_string(), Value::String(target.to_string()));
            }
        }
        Ok(())
    }

    pub fn merge_defaults(
        &mut self,
        id: RouteId,
        defaults: &Map<String, Value>,
    ) -> Result<(), RouteError> {
        let node = self.node_mut(id)?;
        for (k, v) in defaults {
            node.defaults.insert(k.clone(), v.clone());
        }
        Ok(())
    }

    pub fn set_default(&mut self, id: RouteId, key: &str, value: Value) -> Result<(), RouteError> {
        self.node_mut(id)?.defaults.insert(key.to_string(), value);
        Ok(())
    }

    pub fn insert_metadata<T>(
        &mut self,
        id: RouteId,
        key: &'static str,
        value: Arc<T>,
    ) -> Result<(), RouteError>
    where
        T: Any + Send + Sync,
    {
        self.node_mut(id)?.metadata.insert(key, value);
        Ok(())
    }

    /// Metadata stored on `id` itself.
    #[must_use]
    pub fn metadata<T>(&self, id: RouteId, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let value = self.nodes.get(id.0)?.metadata.get(key)?;
        Arc::clone(value).downcast::<T>().ok()
    }

    /// Metadata on `id` or its nearest ancestor carrying `key`.
    #[must_use]
    pub fn find_metadata<T>(&self, id: RouteId, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let mut current = Some(id);
        while let Some(route) = current {
            let node = self.nodes.get(route.0)?;
            if let Some(value) = node.metadata.get(key) {
                return Arc::clone(value).downcast::<T>().ok();
            }
            current = node.parent;
        }
        None
    }

    /// Routes from the root down to `id`, both included.
    pub fn ancestry(&self, id: RouteId) -> Result<Vec<RouteId>, RouteError> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(route) = current {
            chain.push(route);
            current = self.node(route)?.parent;
        }
        chain.reverse();
        Ok(chain)
    }

    /// Full path of a route in router syntax.
    pub fn render_path(&self, id: RouteId) -> Result<String, RouteError> {
        let mut path = String::new();
        for route in self.ancestry(id)? {
            path.push_str(&self.node(route)?.pattern.to_string());
        }
        Ok(path)
    }

    pub fn pattern(&self, id: RouteId) -> Result<&RoutePattern, RouteError> {
        Ok(&self.node(id)?.pattern)
    }

    pub fn parent(&self, id: RouteId) -> Result<Option<RouteId>, RouteError> {
        Ok(self.node(id)?.parent)
    }

    pub fn children(&self, id: RouteId) -> Result<&[RouteId], RouteError> {
        Ok(&self.node(id)?.children)
    }

    pub fn methods(&self, id: RouteId) -> Result<&[Method], RouteError> {
        Ok(&self.node(id)?.methods)
    }

    pub fn route_name(&self, id: RouteId) -> Result<Option<&str>, RouteError> {
        Ok(self.node(id)?.name.as_deref())
    }

    pub fn defaults(&self, id: RouteId) -> Result<&Map<String, Value>, RouteError> {
        Ok(&self.node(id)?.defaults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_path_and_names() {
        let mut table = RouteTable::new();
        let api = table.any(table.root(), "/api").unwrap();
        let pet = table.any(api, "/pets/<id:num>").unwrap();
        table.name(pet, "showPet").unwrap();

        assert_eq!(table.render_path(pet).unwrap(), "/api/pets/<id:num>");
        assert_eq!(table.find("showPet"), Some(pet));
        assert_eq!(table.route_name(pet).unwrap(), Some("showPet"));
        assert_eq!(table.find("missing"), None);
    }

    #[test]
    fn test_name_reassignment_last_wins() {
        let mut table = RouteTable::new();
        let a = table.any(table.root(), "/a").unwrap();
        let b = table.any(table.root(), "/b").unwrap();
        table.name(a, "dup").unwrap();
        table.name(b, "dup").unwrap();
        assert_eq!(table.find("dup"), Some(b));
        assert_eq!(table.route_name(a).unwrap(), None);
    }

    #[test]
    fn test_reparent_moves_subtree() {
        let mut table = RouteTable::new();
        let old = table.any(table.root(), "/old").unwrap();
        let item = table.any(old, "/item").unwrap();
        let child = table.any(item, "/child").unwrap();
        let scope = table.any(table.root(), "/v1").unwrap();

        table.reparent(item, scope).unwrap();
        assert_eq!(table.render_path(child).unwrap(), "/v1/item/child");
        assert!(table.children(old).unwrap().is_empty());

        // Same parent: no-op.
        table.reparent(item, scope).unwrap();
        assert_eq!(table.children(scope).unwrap(), &[item]);
    }

    #[test]
    fn test_reparent_rejects_cycles_and_root() {
        let mut table = RouteTable::new();
        let a = table.any(table.root(), "/a").unwrap();
        let b = table.any(a, "/b").unwrap();
        assert!(matches!(table.reparent(a, b), Err(RouteError::Cycle { .. })));
        assert!(matches!(table.reparent(a, a), Err(RouteError::Cycle { .. })));
        let root = table.root();
        assert!(matches!(table.reparent(root, a), Err(RouteError::MoveRoot)));
    }

    #[test]
    fn test_to_sets_handler_defaults() {
        let mut table = RouteTable::new();
        let a = table.any(table.root(), "/a").unwrap();
        table.to(a, "pets#list").unwrap();
        let b = table.any(table.root(), "/b").unwrap();
        table.to(b, "list_pets").unwrap();

        assert_eq!(table.defaults(a).unwrap()["controller"], json!("pets"));
        assert_eq!(table.defaults(a).unwrap()["action"], json!("list"));
        assert_eq!(table.defaults(b).unwrap()["handler"], json!("list_pets"));
    }

    #[test]
    fn test_metadata_lookup_walks_ancestors() {
        let mut table = RouteTable::new();
        let scope = table.any(table.root(), "/v1").unwrap();
        let leaf = table.any(scope, "/x").unwrap();
        table
            .insert_metadata(scope, "contract", Arc::new(String::from("petstore")))
            .unwrap();

        let found: Arc<String> = table.find_metadata(leaf, "contract").unwrap();
        assert_eq!(found.as_str(), "petstore");
        assert!(table.metadata::<String>(leaf, "contract").is_none());
        assert!(table.find_metadata::<u32>(leaf, "contract").is_none());
    }

    #[test]
    fn test_unknown_route() {
        let mut other = RouteTable::new();
        let a = other.any(other.root(), "/a").unwrap();
        let b = other.any(a, "/b").unwrap();
        let mut table = RouteTable::new();
        assert!(matches!(table.any(b, "/c"), Err(RouteError::UnknownRoute(_))));
    }
}
