//! High-level router API.

use http::Method;

use crate::node::Node;
use crate::params::Params;
use crate::{Lookup, RouteError, RouteMatch};

/// A radix tree route table.
///
/// Routes are matched in O(k) time where k is the number of path segments.
/// When several routes could match, static segments win over parameters,
/// and parameters win over wildcards.
///
/// # Example
///
/// ```rust
/// use veritas_router::Router;
/// use http::Method;
///
/// let mut router = Router::new();
/// router.insert(Method::GET, "/users/me", "currentUser").unwrap();
/// router.insert(Method::GET, "/users/{id}", "getUser").unwrap();
///
/// let m = router.match_route(&Method::GET, "/users/me").unwrap();
/// assert_eq!(*m.value, "currentUser");
///
/// let m = router.match_route(&Method::GET, "/users/42").unwrap();
/// assert_eq!(m.params.get("id"), Some("42"));
/// ```
#[derive(Debug, Clone)]
pub struct Router<T> {
    root: Node<T>,
    route_count: usize,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// Creates a new empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::root(),
            route_count: 0,
        }
    }

    /// Registers `value` for `method` and `path`.
    ///
    /// Registering the same method and path again replaces the earlier value,
    /// which is returned.
    pub fn insert(&mut self, method: Method, path: &str, value: T) -> Result<Option<T>, RouteError> {
        let replaced = self.root.insert(path, method, value)?;
        if replaced.is_none() {
            self.route_count += 1;
        }
        Ok(replaced)
    }

    /// Checks that `path` could be inserted, without inserting it.
    ///
    /// ```rust
    /// use veritas_router::{RouteError, Router};
    /// use http::Method;
    ///
    /// let mut router = Router::new();
    /// router.insert(Method::GET, "/users/{id}", ()).unwrap();
    ///
    /// assert!(router.check("/users/{id}/posts").is_ok());
    /// assert!(matches!(router.check("/users/*rest"), Ok(())));
    /// assert!(matches!(router.check("/files/*rest/meta"), Err(RouteError::WildcardNotLast { .. })));
    /// assert_eq!(router.len(), 1);
    /// ```
    pub fn check(&self, path: &str) -> Result<(), RouteError> {
        self.root.check(path)
    }

    /// Matches a method and path.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, T>> {
        match self.lookup(method, path) {
            Lookup::Found(found) => Some(found),
            Lookup::MethodNotAllowed(_) | Lookup::NotFound => None,
        }
    }

    /// Matches a method and path, telling a missing path apart from a
    /// missing method.
    #[must_use]
    pub fn lookup(&self, method: &Method, path: &str) -> Lookup<'_, T> {
        let mut params = Params::new();
        let Some(node) = self.root.find(path, &mut params) else {
            return Lookup::NotFound;
        };
        match (node.methods().get(method), node.template()) {
            (Some(value), Some(template)) => Lookup::Found(RouteMatch {
                value,
                template,
                params,
            }),
            _ => Lookup::MethodNotAllowed(node.methods().allowed_methods()),
        }
    }

    /// Returns the number of (method, path) routes registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.route_count
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }
}
