//! The dispatcher seam.
//!
//! [`App`](crate::App) only needs somewhere to put bound handlers. Any type
//! implementing [`Dispatcher`] will do; [`RouteTable`] is the built-in one,
//! backed by the radix tree in `veritas-router`.

use std::fmt;

use http::Method;
use serde_json::{Map, Value};
use veritas_core::{ApiError, ApiResult, Reply, RequestContext};
use veritas_router::{Lookup, RouteError, Router};

use crate::binder::BoundHandler;

/// Stores bound handlers by method and path.
pub trait Dispatcher: Send + Sync {
    /// Error returned when a route cannot be stored.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reports whether `register_route` would accept `method` and `path`,
    /// without storing anything.
    fn check_route(&self, _method: &Method, _path: &str) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Stores `handler` for `method` and `path`, replacing any earlier one.
    fn register_route(
        &mut self,
        method: Method,
        path: &str,
        handler: BoundHandler,
    ) -> Result<(), Self::Error>;
}

/// The built-in dispatcher.
///
/// # Example
///
/// ```
/// use http::Method;
/// use veritas::{bind, Dispatcher, RouteSchemas, RouteTable};
/// use veritas_core::{ApiResult, RequestContext, TypedContext};
///
/// let mut table = RouteTable::new();
/// let handler = bind(RouteSchemas::new(), |ctx: TypedContext| async move {
///     ApiResult::Ok(ctx.params)
/// });
/// table.register_route(Method::GET, "/users/{id}", handler).unwrap();
///
/// let reply = tokio_test::block_on(table.dispatch(RequestContext::new(Method::GET, "/users/7")))
///     .unwrap();
/// assert_eq!(reply.status().as_u16(), 200);
/// ```
#[derive(Clone, Default)]
pub struct RouteTable {
    router: Router<BoundHandler>,
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.router.len())
            .finish()
    }
}

impl RouteTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of (method, path) routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.router.len()
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.router.is_empty()
    }

    /// Returns the template of the route `method` and `path` would reach.
    #[must_use]
    pub fn route_template(&self, method: &Method, path: &str) -> Option<&str> {
        self.router.match_route(method, path).map(|found| found.template)
    }

    /// Routes a request to its handler.
    ///
    /// Matched path parameters replace the context's params as an object of
    /// strings, and the matched template is recorded as the route.
    pub async fn dispatch(&self, ctx: RequestContext) -> ApiResult<Reply> {
        let (handler, ctx) = match self.router.lookup(ctx.meta().method(), ctx.meta().path()) {
            Lookup::Found(found) => {
                let params: Map<String, Value> = found
                    .params
                    .into_iter()
                    .map(|(name, value)| (name, Value::String(value)))
                    .collect();
                let ctx = ctx
                    .with_route(found.template)
                    .with_params(Value::Object(params));
                (BoundHandler::clone(found.value), ctx)
            }
            Lookup::MethodNotAllowed(allowed) => {
                return Err(ApiError::method_not_allowed(
                    ctx.meta().method().as_str(),
                    ctx.meta().path(),
                    allowed.iter().map(ToString::to_string).collect(),
                ));
            }
            Lookup::NotFound => return Err(ApiError::not_found(ctx.meta().path())),
        };

        handler(ctx).await
    }
}

impl Dispatcher for RouteTable {
    type Error = RouteError;

    fn check_route(&self, _method: &Method, path: &str) -> Result<(), Self::Error> {
        self.router.check(path)
    }

    fn register_route(
        &mut self,
        method: Method,
        path: &str,
        handler: BoundHandler,
    ) -> Result<(), Self::Error> {
        if self.router.insert(method.clone(), path, handler)?.is_some() {
            tracing::warn!(method = %method, path, "overwriting route handler");
        }
        Ok(())
    }
}
