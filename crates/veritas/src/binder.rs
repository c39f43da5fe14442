//! Request binding.
//!
//! [`bind`] turns a handler that expects a [`TypedContext`] into a
//! [`BoundHandler`] the dispatcher can store. Every call validates params,
//! then query, then body, and stops at the first section that fails. The
//! handler only ever sees validated input.

use std::fmt;
use std::future::{self, Future};
use std::pin::Pin;
use std::sync::Arc;

use veritas_core::{
    ApiError, ApiResult, Describe, IntoReply, Passthrough, Reply, RequestContext, Schema,
    SchemaRef, Section, TypedContext, ValidationError,
};

/// Metric counting requests rejected by a schema, labelled by section.
pub const VALIDATION_FAILURES_METRIC: &str = "veritas_validation_failures_total";

/// Boxed future returned by a [`BoundHandler`].
pub type BoxedReply = Pin<Box<dyn Future<Output = ApiResult<Reply>> + Send>>;

/// A type-erased, validated route handler.
pub type BoundHandler = Arc<dyn Fn(RequestContext) -> BoxedReply + Send + Sync>;

/// The schemas declared for the three request sections.
///
/// Sections without a declared schema use [`Passthrough`] and reach the
/// handler as the raw [`serde_json::Value`].
///
/// # Example
///
/// ```
/// use http::Method;
/// use serde_json::json;
/// use veritas::RouteSchemas;
/// use veritas_core::{RequestContext, Shape};
///
/// let schemas = RouteSchemas::new().query(Shape::object([("test", Shape::string())]));
///
/// let ctx = RequestContext::new(Method::GET, "/with-schema")
///     .with_query(json!({"test": "hello", "extra": 1}));
/// let typed = schemas.apply(ctx).unwrap();
/// assert_eq!(typed.query, json!({"test": "hello"}));
/// ```
pub struct RouteSchemas<P = Passthrough, Q = Passthrough, B = Passthrough> {
    params: Arc<P>,
    query: Arc<Q>,
    body: Arc<B>,
}

impl RouteSchemas {
    /// Schemas that accept anything in every section.
    #[must_use]
    pub fn new() -> Self {
        Self {
            params: Arc::new(Passthrough),
            query: Arc::new(Passthrough),
            body: Arc::new(Passthrough),
        }
    }
}

impl Default for RouteSchemas {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, Q, B> Clone for RouteSchemas<P, Q, B> {
    fn clone(&self) -> Self {
        Self {
            params: Arc::clone(&self.params),
            query: Arc::clone(&self.query),
            body: Arc::clone(&self.body),
        }
    }
}

impl<P, Q, B> fmt::Debug for RouteSchemas<P, Q, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteSchemas")
            .field("params", &std::any::type_name::<P>())
            .field("query", &std::any::type_name::<Q>())
            .field("body", &std::any::type_name::<B>())
            .finish()
    }
}

impl<P, Q, B> RouteSchemas<P, Q, B> {
    /// Declares the path parameter schema.
    pub fn params<S: Schema>(self, schema: S) -> RouteSchemas<S, Q, B> {
        RouteSchemas {
            params: Arc::new(schema),
            query: self.query,
            body: self.body,
        }
    }

    /// Declares the query schema.
    pub fn query<S: Schema>(self, schema: S) -> RouteSchemas<P, S, B> {
        RouteSchemas {
            params: self.params,
            query: Arc::new(schema),
            body: self.body,
        }
    }

    /// Declares the body schema.
    pub fn body<S: Schema>(self, schema: S) -> RouteSchemas<P, Q, S> {
        RouteSchemas {
            params: self.params,
            query: self.query,
            body: Arc::new(schema),
        }
    }
}

impl<P, Q, B> RouteSchemas<P, Q, B>
where
    P: Schema + 'static,
    Q: Schema + 'static,
    B: Schema + 'static,
{
    /// Returns the schema for `section` if it describes anything.
    #[must_use]
    pub fn described(&self, section: Section) -> Option<SchemaRef> {
        let schema = match section {
            Section::Params => Arc::clone(&self.params) as SchemaRef,
            Section::Query => Arc::clone(&self.query) as SchemaRef,
            Section::Body => Arc::clone(&self.body) as SchemaRef,
        };
        schema.describe().is_some().then_some(schema)
    }

    /// Returns true if any section declares a schema.
    #[must_use]
    pub fn is_declared(&self) -> bool {
        Section::ORDERED
            .iter()
            .any(|section| self.described(*section).is_some())
    }

    /// Validates a request and builds the typed context.
    ///
    /// Sections are parsed in params, query, body order. The first failure
    /// is returned tagged with its section; later sections are not parsed.
    pub fn apply(
        &self,
        ctx: RequestContext,
    ) -> Result<TypedContext<P::Output, Q::Output, B::Output>, ValidationError> {
        let (meta, params, query, body) = ctx.into_parts();

        let reject = |err: ValidationError, section: Section| {
            tracing::debug!(
                request_id = %meta.request_id(),
                method = %meta.method(),
                path = meta.path(),
                section = section.as_str(),
                issues = err.len(),
                "request rejected by schema"
            );
            metrics::counter!(VALIDATION_FAILURES_METRIC, "section" => section.as_str())
                .increment(1);
            err.in_section(section)
        };

        let params = self
            .params
            .parse(params)
            .map_err(|e| reject(e, Section::Params))?;
        let query = self
            .query
            .parse(query)
            .map_err(|e| reject(e, Section::Query))?;
        let body = self
            .body
            .parse(body)
            .map_err(|e| reject(e, Section::Body))?;

        Ok(TypedContext::from_parts(meta, params, query, body))
    }
}

/// Wraps `handler` so it runs only on input accepted by `schemas`.
///
/// Validation runs synchronously when the bound handler is called; the
/// returned future resolves to the validation error without polling the
/// handler if any section fails.
///
/// # Example
///
/// ```
/// use http::Method;
/// use serde_json::{json, Value};
/// use veritas::{bind, RouteSchemas};
/// use veritas_core::{ApiResult, RequestContext, Shape, TypedContext};
///
/// let bound = bind(
///     RouteSchemas::new().query(Shape::object([("test", Shape::string())])),
///     |ctx: TypedContext<Value, Value, Value>| async move {
///         ApiResult::Ok(ctx.query["test"].clone())
///     },
/// );
///
/// let ctx = RequestContext::new(Method::GET, "/with-schema").with_query(json!({}));
/// let err = tokio_test::block_on(bound(ctx)).unwrap_err();
/// assert!(err.as_validation().unwrap().mentions("test"));
/// ```
pub fn bind<P, Q, B, F, Fut, R>(schemas: RouteSchemas<P, Q, B>, handler: F) -> BoundHandler
where
    P: Schema + 'static,
    Q: Schema + 'static,
    B: Schema + 'static,
    F: Fn(TypedContext<P::Output, Q::Output, B::Output>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ApiResult<R>> + Send + 'static,
    R: IntoReply + 'static,
{
    Arc::new(move |ctx: RequestContext| -> BoxedReply {
        match schemas.apply(ctx) {
            Ok(typed) => {
                let pending = handler(typed);
                Box::pin(async move { pending.await?.into_reply() })
            }
            Err(err) => Box::pin(future::ready(Err(ApiError::from(err)))),
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use http::Method;
    use serde::Deserialize;
    use serde_json::{json, Value};
    use veritas_core::Shape;

    #[derive(Debug, Deserialize, PartialEq)]
    struct UserParams {
        id: u64,
    }

    fn ctx() -> RequestContext {
        RequestContext::new(Method::GET, "/users/7")
    }

    #[test]
    fn test_passthrough_keeps_values() {
        let raw = ctx()
            .with_params(json!({"id": "7"}))
            .with_query(json!({"a": ["1", "2"]}))
            .with_body(json!({"nested": {"x": null}}));
        let typed = RouteSchemas::new().apply(raw.clone()).unwrap();

        assert_eq!(&typed.params, raw.params());
        assert_eq!(&typed.query, raw.query());
        assert_eq!(&typed.body, raw.body());
        assert_eq!(typed.request_id(), raw.meta().request_id());
    }

    #[test]
    fn test_typed_params() {
        let schemas = RouteSchemas::new().params(
            Shape::object([("id", Shape::integer().coerce())]).typed::<UserParams>(),
        );
        let typed = schemas.apply(ctx().with_params(json!({"id": "7"}))).unwrap();
        assert_eq!(typed.params, UserParams { id: 7 });
    }

    #[test]
    fn test_params_fail_before_query() {
        let schemas = RouteSchemas::new()
            .params(Shape::object([("id", Shape::integer().coerce())]))
            .query(Shape::object([("test", Shape::string())]));

        let err = schemas
            .apply(ctx().with_params(json!({"id": "seven"})).with_query(json!({})))
            .unwrap_err();
        assert_eq!(err.section(), Some(Section::Params));
        assert!(err.mentions("id"));
        assert!(!err.mentions("test"));
    }

    #[test]
    fn test_body_checked_last() {
        let schemas = RouteSchemas::new()
            .query(Shape::object([("test", Shape::string())]))
            .body(Shape::object([("test", Shape::string())]));

        let err = schemas
            .apply(ctx().with_query(json!({"test": "ok"})).with_body(json!({"test": 1})))
            .unwrap_err();
        assert_eq!(err.section(), Some(Section::Body));
    }

    #[test]
    fn test_described_skips_passthrough() {
        let schemas = RouteSchemas::new().query(Shape::object([("test", Shape::string())]));
        assert!(schemas.described(Section::Query).is_some());
        assert!(schemas.described(Section::Params).is_none());
        assert!(schemas.is_declared());
        assert!(!RouteSchemas::new().is_declared());
    }

    #[tokio::test]
    async fn test_bound_handler_not_called_on_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let bound = bind(
            RouteSchemas::new().query(Shape::object([("test", Shape::string())])),
            move |ctx: TypedContext<Value, Value, Value>| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok(ctx.query) }
            },
        );

        let err = bound(ctx()).await.unwrap_err();
        assert!(err.as_validation().is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let reply = bound(ctx().with_query(json!({"test": "hello"}))).await.unwrap();
        assert_eq!(reply.body(), &veritas_core::ReplyBody::Json(json!({"test": "hello"})));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handler_error_passes_through() {
        let bound = bind(RouteSchemas::new(), |_ctx: TypedContext| async move {
            Err::<(), _>(ApiError::internal("storage unavailable"))
        });
        let err = bound(ctx()).await.unwrap_err();
        assert!(matches!(err, ApiError::Internal { .. }));
    }
}
