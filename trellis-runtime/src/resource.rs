//! Resource definitions and the objects assembled from them.

use std::collections::BTreeMap;

use serde::Serialize;
use trellis_ir::Method;

/// What a caller asks the runtime to define.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceConfig {
    pub name: String,
    /// Overrides the runtime's default namespace.
    pub namespace: Option<String>,
    /// Path per operation, e.g. `List => "/acme/v1/posts"`.
    pub routes: BTreeMap<Method, String>,
}

impl ResourceConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn route(mut self, method: Method, path: impl Into<String>) -> Self {
        self.routes.insert(method, path.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub method: Method,
    /// HTTP verb the route is served under.
    pub verb: &'static str,
    pub path: String,
}

/// Routes of one resource, ordered by operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteTable(Vec<Route>);

impl RouteTable {
    pub fn new(routes: impl IntoIterator<Item = Route>) -> Self {
        let mut routes: Vec<Route> = routes.into_iter().collect();
        routes.sort_by_key(|route| route.method);
        Self(routes)
    }

    pub fn get(&self, method: Method) -> Option<&Route> {
        self.0.iter().find(|route| route.method == method)
    }

    pub fn methods(&self) -> impl Iterator<Item = Method> + '_ {
        self.0.iter().map(|route| route.method)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Builds cache keys for the operations a resource exposes.
///
/// Keys are `:`-joined segments: the resource name, the operation and an
/// optional argument (an id or a serialized query).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheKeys {
    resource: String,
    methods: Vec<Method>,
}

impl CacheKeys {
    pub fn new(resource: impl Into<String>, methods: impl IntoIterator<Item = Method>) -> Self {
        Self {
            resource: resource.into(),
            methods: methods.into_iter().collect(),
        }
    }

    /// The key for `method`, or `None` when the resource does not expose it.
    pub fn key(&self, method: Method, argument: Option<&str>) -> Option<String> {
        if !self.methods.contains(&method) {
            return None;
        }
        let mut segments = vec![self.resource.as_str(), method.as_str()];
        segments.extend(argument);
        Some(segments.join(":"))
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }
}

/// A defined resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceObject {
    pub name: String,
    pub namespace: String,
    /// `<namespace>/<name>`, unique within a runtime.
    pub store_key: String,
    pub routes: RouteTable,
    pub cache_keys: CacheKeys,
}

impl ResourceObject {
    pub fn route(&self, method: Method) -> Option<&Route> {
        self.routes.get(method)
    }

    pub fn cache_key(&self, method: Method, argument: Option<&str>) -> Option<String> {
        self.cache_keys.key(method, argument)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_keys() {
        let keys = CacheKeys::new("post", [Method::List, Method::Get]);

        assert_eq!(keys.key(Method::List, None).as_deref(), Some("post:list"));
        assert_eq!(
            keys.key(Method::Get, Some("42")).as_deref(),
            Some("post:get:42")
        );
        assert_eq!(keys.key(Method::Remove, Some("42")), None);
    }

    #[test]
    fn test_route_table_is_ordered_by_method() {
        let table = RouteTable::new([
            Route {
                method: Method::Create,
                verb: "POST",
                path: "/posts".into(),
            },
            Route {
                method: Method::List,
                verb: "GET",
                path: "/posts".into(),
            },
        ]);

        assert_eq!(
            table.methods().collect::<Vec<_>>(),
            vec![Method::List, Method::Create]
        );
        assert_eq!(table.get(Method::Create).map(|r| r.verb), Some("POST"));
        assert!(table.get(Method::Get).is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = ResourceConfig::new("post")
            .namespace("acme")
            .route(Method::Get, "/posts/:id")
            .route(Method::Get, "/posts/(?P<id>\\d+)");

        assert_eq!(config.namespace.as_deref(), Some("acme"));
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.routes[&Method::Get], "/posts/(?P<id>\\d+)");
    }
}
