//! Request context types.
//!
//! The transport builds a [`RequestContext`] holding the decoded but
//! unvalidated request sections. The binder consumes it and produces a
//! [`TypedContext`], a new value whose sections have the types declared by
//! the route's schemas. Nothing is mutated in place.

use std::sync::Arc;
use std::time::{Duration, Instant};

use http::{HeaderMap, Method};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::capabilities::Capabilities;
use crate::error::ApiResult;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which keeps log lines for one request easy to
/// find and sort.
///
/// # Example
///
/// ```
/// use veritas_core::RequestId;
///
/// let id = RequestId::new();
/// println!("Request ID: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parses a request ID supplied by a client, e.g. `x-request-id`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s.trim()).ok().map(Self)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Everything about a request except its three validated sections.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    request_id: RequestId,
    method: Method,
    path: String,
    route: Option<String>,
    headers: HeaderMap,
    capabilities: Arc<Capabilities>,
    started_at: Instant,
}

impl RequestMeta {
    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the concrete request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the matched route template, e.g. `/users/{id}`.
    #[must_use]
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    /// Returns the request headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the injected capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Returns the time since the request was received.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// A request as decoded by the transport, before validation.
///
/// Params and query default to an empty object, body to `null`.
///
/// # Example
///
/// ```
/// use http::Method;
/// use serde_json::json;
/// use veritas_core::RequestContext;
///
/// let ctx = RequestContext::new(Method::GET, "/with-schema")
///     .with_query(json!({"test": "hello"}));
///
/// assert_eq!(ctx.query()["test"], "hello");
/// assert_eq!(ctx.body(), &json!(null));
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    meta: RequestMeta,
    params: Value,
    query: Value,
    body: Value,
}

impl RequestContext {
    /// Creates a context for `method` and `path`.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            meta: RequestMeta {
                request_id: RequestId::new(),
                method,
                path: path.into(),
                route: None,
                headers: HeaderMap::new(),
                capabilities: Arc::new(Capabilities::new()),
                started_at: Instant::now(),
            },
            params: Value::Object(serde_json::Map::new()),
            query: Value::Object(serde_json::Map::new()),
            body: Value::Null,
        }
    }

    /// Sets the raw path parameters.
    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    /// Sets the raw query parameters.
    #[must_use]
    pub fn with_query(mut self, query: Value) -> Self {
        self.query = query;
        self
    }

    /// Sets the raw body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Sets the request headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.meta.headers = headers;
        self
    }

    /// Sets the matched route template.
    #[must_use]
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.meta.route = Some(route.into());
        self
    }

    /// Sets the request ID.
    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.meta.request_id = request_id;
        self
    }

    /// Shares an application's capabilities with this request.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Arc<Capabilities>) -> Self {
        self.meta.capabilities = capabilities;
        self
    }

    /// Returns request metadata.
    #[must_use]
    pub const fn meta(&self) -> &RequestMeta {
        &self.meta
    }

    /// Returns the raw path parameters.
    #[must_use]
    pub const fn params(&self) -> &Value {
        &self.params
    }

    /// Returns the raw query parameters.
    #[must_use]
    pub const fn query(&self) -> &Value {
        &self.query
    }

    /// Returns the raw body.
    #[must_use]
    pub const fn body(&self) -> &Value {
        &self.body
    }

    /// Splits the context into metadata, params, query and body.
    #[must_use]
    pub fn into_parts(self) -> (RequestMeta, Value, Value, Value) {
        (self.meta, self.params, self.query, self.body)
    }
}

/// A validated request handed to a route handler.
///
/// Each section has the output type of the schema declared for it, or
/// [`Value`] when the route declared none.
#[derive(Debug, Clone)]
pub struct TypedContext<P = Value, Q = Value, B = Value> {
    /// Validated path parameters.
    pub params: P,
    /// Validated query parameters.
    pub query: Q,
    /// Validated body.
    pub body: B,
    meta: RequestMeta,
}

impl<P, Q, B> TypedContext<P, Q, B> {
    /// Assembles a typed context.
    #[must_use]
    pub const fn from_parts(meta: RequestMeta, params: P, query: Q, body: B) -> Self {
        Self {
            params,
            query,
            body,
            meta,
        }
    }

    /// Returns request metadata.
    #[must_use]
    pub const fn meta(&self) -> &RequestMeta {
        &self.meta
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.meta.request_id
    }

    /// Looks up an injected capability.
    pub fn capability<T: Send + Sync + 'static>(&self) -> ApiResult<Arc<T>> {
        self.meta.capabilities.require()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_id_unique() {
        let a = RequestId::new();
        let b = RequestId::new();
        assert_ne!(a, b);
        assert_eq!(a.as_uuid().get_version_num(), 7);
    }

    #[test]
    fn test_request_id_parse() {
        let id = RequestId::new();
        assert_eq!(RequestId::parse(&id.to_string()), Some(id));
        assert_eq!(RequestId::parse("not-a-uuid"), None);
    }

    #[test]
    fn test_context_defaults() {
        let ctx = RequestContext::new(Method::POST, "/items");
        assert_eq!(ctx.params(), &json!({}));
        assert_eq!(ctx.query(), &json!({}));
        assert_eq!(ctx.body(), &Value::Null);
        assert_eq!(ctx.meta().method(), Method::POST);
        assert_eq!(ctx.meta().path(), "/items");
        assert!(ctx.meta().route().is_none());
    }

    #[test]
    fn test_into_parts() {
        let ctx = RequestContext::new(Method::GET, "/users/7")
            .with_route("/users/{id}")
            .with_params(json!({"id": "7"}))
            .with_body(json!("text"));
        let (meta, params, query, body) = ctx.into_parts();
        assert_eq!(meta.route(), Some("/users/{id}"));
        assert_eq!(params, json!({"id": "7"}));
        assert_eq!(query, json!({}));
        assert_eq!(body, json!("text"));
    }

    #[test]
    fn test_header_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert("x-tenant", "acme".parse().unwrap());
        let ctx = RequestContext::new(Method::GET, "/").with_headers(headers);
        assert_eq!(ctx.meta().header("x-tenant"), Some("acme"));
        assert_eq!(ctx.meta().header("x-missing"), None);
    }

    #[test]
    fn test_typed_context_capability() {
        struct Db;
        let mut caps = Capabilities::new();
        caps.insert(Arc::new(Db));
        let ctx = RequestContext::new(Method::GET, "/").with_capabilities(Arc::new(caps));
        let (meta, ..) = ctx.into_parts();
        let typed = TypedContext::from_parts(meta, (), (), ());
        assert!(typed.capability::<Db>().is_ok());
        assert!(typed.capability::<String>().is_err());
    }
}
