//! Route registration.
//!
//! [`App`] is where routes are declared. Each registration documents the
//! route's schemas in the [`DocumentRegistry`], binds the handler to those
//! same schemas, and hands the bound handler to the dispatcher.

use std::future::Future;
use std::sync::Arc;

use http::Method;
use indexmap::IndexMap;
use veritas_core::{
    ApiResult, Capabilities, Describe, IntoReply, Json, Reply, RequestContext, Schema, Section,
    TypedContext,
};
use veritas_docs::{
    BodyDescriptor, DocumentGenerator, DocumentRegistry, OperationRecord, RequestDescriptor,
    ResponseDescriptor, RouteDocs, SchemaKind,
};

use crate::binder::{bind, BoundHandler};
use crate::dispatcher::{Dispatcher, RouteTable};
use crate::error::RegisterError;
use crate::route::RouteSpec;

/// Methods covered by [`App::all`].
pub const STANDARD_METHODS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
];

/// An application: routes, their documentation and injected capabilities.
///
/// # Example
///
/// ```
/// use serde_json::Value;
/// use veritas::{App, RouteSpec};
/// use veritas_core::{ApiResult, Shape, TypedContext};
///
/// let mut app = App::new();
/// app.get(
///     "/with-schema",
///     |ctx: TypedContext<Value, Value, Value>| async move {
///         ApiResult::Ok(ctx.query["test"].as_str().unwrap_or_default().to_string())
///     },
///     RouteSpec::new().query(Shape::object([("test", Shape::string())])),
/// )
/// .unwrap();
///
/// assert_eq!(app.registry().operation_count(), 1);
/// ```
pub struct App<D = RouteTable> {
    dispatcher: D,
    registry: DocumentRegistry,
    capabilities: Arc<Capabilities>,
}

impl App {
    /// Creates an application with the built-in route table and a fresh
    /// registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_dispatcher(RouteTable::new(), DocumentRegistry::new())
    }

    /// Creates an application that documents into `registry`.
    #[must_use]
    pub fn with_registry(registry: DocumentRegistry) -> Self {
        Self::with_dispatcher(RouteTable::new(), registry)
    }

    /// Routes a request through the route table.
    ///
    /// The application's capabilities are attached to the request first.
    pub async fn dispatch(&self, ctx: RequestContext) -> ApiResult<Reply> {
        let ctx = ctx.with_capabilities(Arc::clone(&self.capabilities));
        self.dispatcher.dispatch(ctx).await
    }

    /// Returns the template of the route a request would reach.
    #[must_use]
    pub fn route_template(&self, method: &Method, path: &str) -> Option<&str> {
        self.dispatcher.route_template(method, path)
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: std::fmt::Debug> std::fmt::Debug for App<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("dispatcher", &self.dispatcher)
            .field("registry", &self.registry)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

impl<D: Dispatcher> App<D> {
    /// Creates an application around a custom dispatcher.
    pub fn with_dispatcher(dispatcher: D, registry: DocumentRegistry) -> Self {
        Self {
            dispatcher,
            registry,
            capabilities: Arc::new(Capabilities::new()),
        }
    }

    /// Returns the document registry.
    pub const fn registry(&self) -> &DocumentRegistry {
        &self.registry
    }

    /// Returns the dispatcher.
    pub const fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Returns the injected capabilities.
    pub fn capabilities(&self) -> Arc<Capabilities> {
        Arc::clone(&self.capabilities)
    }

    /// Injects a capability into every request, such as a storage client.
    ///
    /// Handlers read it back with
    /// [`TypedContext::capability`](veritas_core::TypedContext::capability).
    pub fn decorate<T: Send + Sync + 'static>(&mut self, value: Arc<T>) -> &mut Self {
        Arc::make_mut(&mut self.capabilities).insert(value);
        self
    }

    /// Registers a route.
    ///
    /// The path is checked with the dispatcher first. Declared schemas and
    /// the operation are then documented in one registry commit, and the
    /// handler is bound to those schemas and stored in the dispatcher. A
    /// failure at either check leaves both registry and dispatcher
    /// untouched. A route that declares nothing is dispatched but left out
    /// of the document. Registering the same method and path again replaces
    /// the earlier handler and documentation.
    pub fn register<P, Q, B, F, Fut, R>(
        &mut self,
        method: Method,
        path: &str,
        handler: F,
        spec: RouteSpec<P, Q, B>,
    ) -> Result<&mut Self, RegisterError>
    where
        P: Schema + 'static,
        Q: Schema + 'static,
        B: Schema + 'static,
        F: Fn(TypedContext<P::Output, Q::Output, B::Output>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<R>> + Send + 'static,
        R: IntoReply + 'static,
    {
        self.install(std::slice::from_ref(&method), path, handler, spec)
    }

    fn install<P, Q, B, F, Fut, R>(
        &mut self,
        methods: &[Method],
        path: &str,
        handler: F,
        spec: RouteSpec<P, Q, B>,
    ) -> Result<&mut Self, RegisterError>
    where
        P: Schema + 'static,
        Q: Schema + 'static,
        B: Schema + 'static,
        F: Fn(TypedContext<P::Output, Q::Output, B::Output>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<R>> + Send + 'static,
        R: IntoReply + 'static,
    {
        for method in methods {
            self.dispatcher
                .check_route(method, path)
                .map_err(|e| RegisterError::dispatcher(method, path, e))?;
        }

        if spec.is_documented() {
            self.document(methods, path, &spec)?;
        }

        let bound: BoundHandler = bind(spec.schemas, handler);
        for method in methods {
            self.dispatcher
                .register_route(method.clone(), path, BoundHandler::clone(&bound))
                .map_err(|e| RegisterError::dispatcher(method, path, e))?;
            tracing::debug!(method = %method, path, "route registered");
        }
        Ok(self)
    }

    fn document<P, Q, B>(
        &self,
        methods: &[Method],
        path: &str,
        spec: &RouteSpec<P, Q, B>,
    ) -> Result<(), RegisterError>
    where
        P: Schema + 'static,
        Q: Schema + 'static,
        B: Schema + 'static,
    {
        let params = spec.schemas.described(Section::Params);
        let query = spec.schemas.described(Section::Query);

        let mut keyed = Vec::new();
        keyed.extend(params.clone().map(|schema| (SchemaKind::Params, schema)));
        keyed.extend(query.clone().map(|schema| (SchemaKind::Query, schema)));
        keyed.extend(
            spec.schemas
                .described(Section::Body)
                .map(|schema| (SchemaKind::Body, schema)),
        );
        for response in &spec.docs.responses {
            if let Some(schema) = response.schema.as_ref().filter(|s| s.describe().is_some()) {
                keyed.push((SchemaKind::Response(response.status), Arc::clone(schema)));
            }
        }

        let docs = &spec.docs;
        let operations = |names: &IndexMap<SchemaKind, String>| -> Vec<OperationRecord> {
            let request = RequestDescriptor {
                params,
                query,
                body: names.get(&SchemaKind::Body).map(|name| BodyDescriptor {
                    schema: name.clone(),
                    required: docs.body_required,
                    description: docs.body_description.clone(),
                }),
            };

            let mut responses = IndexMap::new();
            for response in &docs.responses {
                let mut descriptor = ResponseDescriptor::new(response.description.clone());
                if let Some(name) = names.get(&SchemaKind::Response(response.status)) {
                    descriptor = descriptor.with_schema(name.clone());
                }
                responses.insert(response.status.to_string(), descriptor);
            }

            methods
                .iter()
                .map(|method| {
                    let mut record = OperationRecord::new(
                        method.clone(),
                        path,
                        request.clone(),
                        responses.clone(),
                    );
                    record.operation_id.clone_from(&docs.operation_id);
                    record.summary.clone_from(&docs.summary);
                    record.description.clone_from(&docs.description);
                    record.tags.clone_from(&docs.tags);
                    record.deprecated = docs.deprecated;
                    record
                })
                .collect()
        };

        self.registry.register_route(RouteDocs {
            path: path.to_string(),
            keyed,
            operations,
        })?;
        Ok(())
    }

    /// Registers a `GET` route.
    pub fn get<P, Q, B, F, Fut, R>(
        &mut self,
        path: &str,
        handler: F,
        spec: RouteSpec<P, Q, B>,
    ) -> Result<&mut Self, RegisterError>
    where
        P: Schema + 'static,
        Q: Schema + 'static,
        B: Schema + 'static,
        F: Fn(TypedContext<P::Output, Q::Output, B::Output>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<R>> + Send + 'static,
        R: IntoReply + 'static,
    {
        self.register(Method::GET, path, handler, spec)
    }

    /// Registers a `POST` route.
    pub fn post<P, Q, B, F, Fut, R>(
        &mut self,
        path: &str,
        handler: F,
        spec: RouteSpec<P, Q, B>,
    ) -> Result<&mut Self, RegisterError>
    where
        P: Schema + 'static,
        Q: Schema + 'static,
        B: Schema + 'static,
        F: Fn(TypedContext<P::Output, Q::Output, B::Output>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<R>> + Send + 'static,
        R: IntoReply + 'static,
    {
        self.register(Method::POST, path, handler, spec)
    }

    /// Registers a `PUT` route.
    pub fn put<P, Q, B, F, Fut, R>(
        &mut self,
        path: &str,
        handler: F,
        spec: RouteSpec<P, Q, B>,
    ) -> Result<&mut Self, RegisterError>
    where
        P: Schema + 'static,
        Q: Schema + 'static,
        B: Schema + 'static,
        F: Fn(TypedContext<P::Output, Q::Output, B::Output>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<R>> + Send + 'static,
        R: IntoReply + 'static,
    {
        self.register(Method::PUT, path, handler, spec)
    }

    /// Registers a `PATCH` route.
    pub fn patch<P, Q, B, F, Fut, R>(
        &mut self,
        path: &str,
        handler: F,
        spec: RouteSpec<P, Q, B>,
    ) -> Result<&mut Self, RegisterError>
    where
        P: Schema + 'static,
        Q: Schema + 'static,
        B: Schema + 'static,
        F: Fn(TypedContext<P::Output, Q::Output, B::Output>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<R>> + Send + 'static,
        R: IntoReply + 'static,
    {
        self.register(Method::PATCH, path, handler, spec)
    }

    /// Registers a `DELETE` route.
    pub fn delete<P, Q, B, F, Fut, R>(
        &mut self,
        path: &str,
        handler: F,
        spec: RouteSpec<P, Q, B>,
    ) -> Result<&mut Self, RegisterError>
    where
        P: Schema + 'static,
        Q: Schema + 'static,
        B: Schema + 'static,
        F: Fn(TypedContext<P::Output, Q::Output, B::Output>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<R>> + Send + 'static,
        R: IntoReply + 'static,
    {
        self.register(Method::DELETE, path, handler, spec)
    }

    /// Registers a `HEAD` route.
    pub fn head<P, Q, B, F, Fut, R>(
        &mut self,
        path: &str,
        handler: F,
        spec: RouteSpec<P, Q, B>,
    ) -> Result<&mut Self, RegisterError>
    where
        P: Schema + 'static,
        Q: Schema + 'static,
        B: Schema + 'static,
        F: Fn(TypedContext<P::Output, Q::Output, B::Output>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<R>> + Send + 'static,
        R: IntoReply + 'static,
    {
        self.register(Method::HEAD, path, handler, spec)
    }

    /// Registers an `OPTIONS` route.
    pub fn options<P, Q, B, F, Fut, R>(
        &mut self,
        path: &str,
        handler: F,
        spec: RouteSpec<P, Q, B>,
    ) -> Result<&mut Self, RegisterError>
    where
        P: Schema + 'static,
        Q: Schema + 'static,
        B: Schema + 'static,
        F: Fn(TypedContext<P::Output, Q::Output, B::Output>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<R>> + Send + 'static,
        R: IntoReply + 'static,
    {
        self.register(Method::OPTIONS, path, handler, spec)
    }

    /// Registers a route for every method in [`STANDARD_METHODS`].
    ///
    /// The handler is bound once and shared by all methods.
    pub fn all<P, Q, B, F, Fut, R>(
        &mut self,
        path: &str,
        handler: F,
        spec: RouteSpec<P, Q, B>,
    ) -> Result<&mut Self, RegisterError>
    where
        P: Schema + 'static,
        Q: Schema + 'static,
        B: Schema + 'static,
        F: Fn(TypedContext<P::Output, Q::Output, B::Output>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<R>> + Send + 'static,
        R: IntoReply + 'static,
    {
        self.install(&STANDARD_METHODS, path, handler, spec)
    }

    /// Registers a route for an explicit method, including extension methods.
    pub fn route<P, Q, B, F, Fut, R>(
        &mut self,
        method: Method,
        path: &str,
        handler: F,
        spec: RouteSpec<P, Q, B>,
    ) -> Result<&mut Self, RegisterError>
    where
        P: Schema + 'static,
        Q: Schema + 'static,
        B: Schema + 'static,
        F: Fn(TypedContext<P::Output, Q::Output, B::Output>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<R>> + Send + 'static,
        R: IntoReply + 'static,
    {
        self.register(method, path, handler, spec)
    }

    /// Serves the generated document as JSON at `path`.
    ///
    /// The document is generated on every request, so routes registered
    /// after this call still appear. The docs route itself is not
    /// documented.
    pub fn serve_docs(
        &mut self,
        path: &str,
        generator: DocumentGenerator,
    ) -> Result<&mut Self, RegisterError> {
        let registry = self.registry.clone();
        self.register(
            Method::GET,
            path,
            move |_ctx: TypedContext| {
                let document = generator.generate(&registry);
                async move { ApiResult::Ok(Json(document)) }
            },
            RouteSpec::new(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use veritas_core::{ReplyBody, Shape};
    use veritas_docs::{ConflictPolicy, DocsError};

    fn test_shape() -> Shape {
        Shape::object([("test", Shape::string())])
    }

    async fn ok(_ctx: TypedContext) -> ApiResult<&'static str> {
        Ok("ok")
    }

    #[test]
    fn test_undeclared_route_not_documented() {
        let mut app = App::new();
        app.get("/", ok, RouteSpec::new()).unwrap();
        assert!(app.registry().is_empty());
        assert_eq!(app.dispatcher().len(), 1);
    }

    #[test]
    fn test_declared_route_documented() {
        let mut app = App::new();
        app.post(
            "/post-with-schema",
            |ctx: TypedContext| async move { ApiResult::Ok(ctx.body) },
            RouteSpec::new()
                .body(test_shape())
                .response(200, "Successful response", test_shape()),
        )
        .unwrap();

        let registry = app.registry();
        assert!(registry.schema("PostWithSchemaBody").is_some());
        assert!(registry.schema("PostWithSchemaResponse200").is_some());
        let op = registry.operation(&Method::POST, "/post-with-schema").unwrap();
        assert_eq!(op.request.body.unwrap().schema, "PostWithSchemaBody");
        assert_eq!(
            op.responses["200"].schema.as_deref(),
            Some("PostWithSchemaResponse200")
        );
    }

    #[test]
    fn test_all_registers_every_method() {
        let mut app = App::with_registry(DocumentRegistry::with_policy(ConflictPolicy::Reject));
        app.all("/any", ok, RouteSpec::new().query(test_shape()))
            .unwrap();

        assert_eq!(app.dispatcher().len(), STANDARD_METHODS.len());
        assert_eq!(app.registry().operation_count(), STANDARD_METHODS.len());
        assert_eq!(app.registry().schema_count(), 1);
    }

    #[test]
    fn test_reject_policy_surfaces_conflict() {
        let mut app = App::with_registry(DocumentRegistry::with_policy(ConflictPolicy::Reject));
        app.get("/dup", ok, RouteSpec::new().summary("first")).unwrap();
        let err = app
            .get("/dup", ok, RouteSpec::new().summary("second"))
            .unwrap_err();
        assert!(matches!(
            err,
            RegisterError::Docs(DocsError::RegistrationConflict { .. })
        ));
    }

    #[test]
    fn test_bad_template_is_dispatcher_error() {
        let mut app = App::new();
        let err = app.get("/files/*rest/meta", ok, RouteSpec::new()).unwrap_err();
        assert!(matches!(err, RegisterError::Dispatcher { .. }));
        assert!(err.to_string().contains("GET /files/*rest/meta"));
    }

    #[test]
    fn test_bad_template_leaves_nothing_documented() {
        let mut app = App::new();
        let err = app
            .get("/files/*rest/meta", ok, RouteSpec::new().query(test_shape()))
            .unwrap_err();

        assert!(matches!(err, RegisterError::Dispatcher { .. }));
        assert!(app.registry().is_empty());
        assert!(app.dispatcher().is_empty());
        let doc = DocumentGenerator::new().generate(app.registry());
        assert!(doc.paths.is_empty());
    }

    #[test]
    fn test_rejected_duplicate_leaves_no_orphan_schema() {
        let mut app = App::with_registry(DocumentRegistry::with_policy(ConflictPolicy::Reject));
        app.get("/dup", ok, RouteSpec::new().summary("first")).unwrap();
        let err = app
            .get("/dup", ok, RouteSpec::new().query(test_shape()))
            .unwrap_err();

        assert!(matches!(
            err,
            RegisterError::Docs(DocsError::RegistrationConflict { .. })
        ));
        assert_eq!(app.registry().schema_count(), 0);
        let op = app.registry().operation(&Method::GET, "/dup").unwrap();
        assert_eq!(op.summary.as_deref(), Some("first"));
        assert!(op.request.query.is_none());
        assert_eq!(app.dispatcher().len(), 1);
    }

    #[test]
    fn test_similar_paths_document_their_own_bodies() {
        let mut app = App::with_registry(DocumentRegistry::with_policy(ConflictPolicy::Reject));
        app.post(
            "/with-schema",
            ok,
            RouteSpec::new().body(Shape::object([("a", Shape::string())])),
        )
        .unwrap();
        app.post(
            "/with/schema",
            ok,
            RouteSpec::new().body(Shape::object([("b", Shape::integer())])),
        )
        .unwrap();

        let doc = serde_json::to_value(DocumentGenerator::new().generate(app.registry())).unwrap();
        let body_ref = |path: &str| {
            doc["paths"][path]["post"]["requestBody"]["content"]["application/json"]["schema"]
                ["$ref"]
                .as_str()
                .unwrap()
                .trim_start_matches("#/components/schemas/")
                .to_string()
        };
        let dashed = body_ref("/with-schema");
        let nested = body_ref("/with/schema");

        assert_ne!(dashed, nested);
        let schemas = &doc["components"]["schemas"];
        assert!(schemas[&dashed]["properties"]["a"].is_object());
        assert!(schemas[&nested]["properties"]["b"].is_object());
    }

    #[tokio::test]
    async fn test_serve_docs_reflects_later_routes() {
        let mut app = App::new();
        app.serve_docs("/openapi.json", DocumentGenerator::new()).unwrap();
        app.get("/with-schema", ok, RouteSpec::new().query(test_shape()))
            .unwrap();

        let reply = app
            .dispatch(RequestContext::new(Method::GET, "/openapi.json"))
            .await
            .unwrap();
        let ReplyBody::Json(doc) = reply.body() else {
            panic!("expected JSON reply");
        };
        assert_eq!(doc["info"]["title"], "My API");
        assert!(doc["paths"]["/with-schema"]["get"].is_object());
        assert!(doc["paths"].get("/openapi.json").is_none());
        assert_eq!(
            doc["paths"]["/with-schema"]["get"]["parameters"][0],
            json!({"name": "test", "in": "query", "required": true, "schema": {"type": "string"}})
        );
    }

    #[tokio::test]
    async fn test_decorate_exposes_capability() {
        struct Pool(&'static str);

        let mut app = App::new();
        app.decorate(Arc::new(Pool("postgres://db")));
        app.get(
            "/access-db",
            |ctx: TypedContext| async move {
                let pool = ctx.capability::<Pool>()?;
                ApiResult::Ok(Value::String(pool.0.to_string()))
            },
            RouteSpec::new(),
        )
        .unwrap();

        let reply = app
            .dispatch(RequestContext::new(Method::GET, "/access-db"))
            .await
            .unwrap();
        assert_eq!(reply.body(), &ReplyBody::Json(json!("postgres://db")));
    }
}
