//! The document registry.
//!
//! Route registration records here what each route expects and returns; the
//! [`DocumentGenerator`](crate::DocumentGenerator) reads it back. The
//! registry is an explicit value owned by the application, cloned cheaply
//! into anything that needs to register or read.
//!
//! Component schemas are stored by name. Route-scoped schemas are stored
//! under a [`SchemaKey`] and also published as a component under a name
//! owned by that key, so one shape is registered once and referenced
//! everywhere. Distinct keys never share a component name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::Method;
use indexmap::IndexMap;
use parking_lot::RwLock;
use veritas_core::{SchemaRef, Section};

use crate::error::{DocsError, DocsResult};

/// What to do when a name or operation is registered twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// The later registration wins and a warning is logged.
    #[default]
    Overwrite,
    /// The later registration fails with [`DocsError::RegistrationConflict`].
    Reject,
}

/// The role a route-scoped schema plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    /// Path parameters.
    Params,
    /// Query string.
    Query,
    /// Request body.
    Body,
    /// Response body for a status code.
    Response(u16),
}

impl SchemaKind {
    fn suffix(self) -> String {
        match self {
            Self::Params => "Params".to_string(),
            Self::Query => "Query".to_string(),
            Self::Body => "Body".to_string(),
            Self::Response(status) => format!("Response{status}"),
        }
    }
}

impl From<Section> for SchemaKind {
    fn from(section: Section) -> Self {
        match section {
            Section::Params => Self::Params,
            Section::Query => Self::Query,
            Section::Body => Self::Body,
        }
    }
}

/// Identifies a schema by route path and role.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaKey {
    /// Route path template.
    pub path: String,
    /// Role within the route.
    pub kind: SchemaKind,
}

impl SchemaKey {
    /// Creates a key.
    pub fn new(path: impl Into<String>, kind: SchemaKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Returns the component name derived from the path and role.
    ///
    /// Path segments are split on punctuation and joined in PascalCase;
    /// the root path becomes `Root`. Different keys can derive the same
    /// name; the registry numbers the later ones apart.
    ///
    /// ```
    /// use veritas_docs::{SchemaKey, SchemaKind};
    ///
    /// let key = SchemaKey::new("/post-with-schema", SchemaKind::Body);
    /// assert_eq!(key.component_name(), "PostWithSchemaBody");
    ///
    /// let key = SchemaKey::new("/users/{id}", SchemaKind::Response(404));
    /// assert_eq!(key.component_name(), "UsersIdResponse404");
    /// ```
    #[must_use]
    pub fn component_name(&self) -> String {
        let mut name: String = self
            .path
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(capitalize)
            .collect();
        if name.is_empty() {
            name.push_str("Root");
        }
        name.push_str(&self.kind.suffix());
        name
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_ascii_uppercase().to_string() + chars.as_str()
    })
}

/// Request body as documented for an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyDescriptor {
    /// Component schema name.
    pub schema: String,
    /// Whether a body must be sent.
    pub required: bool,
    /// Description.
    pub description: Option<String>,
}

impl BodyDescriptor {
    /// A required JSON body referencing the component `schema`.
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            required: true,
            description: None,
        }
    }
}

/// One documented response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseDescriptor {
    /// Response description.
    pub description: String,
    /// Component schema name of the JSON body, if any.
    pub schema: Option<String>,
}

impl ResponseDescriptor {
    /// A response without a documented body.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            schema: None,
        }
    }

    /// Documents a JSON body referencing the component `schema`.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

/// What an operation expects.
///
/// Params and query schemas are kept whole; the generator expands them into
/// one parameter per declared field.
#[derive(Clone, Default)]
pub struct RequestDescriptor {
    /// Path parameter schema.
    pub params: Option<SchemaRef>,
    /// Query schema.
    pub query: Option<SchemaRef>,
    /// Request body.
    pub body: Option<BodyDescriptor>,
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("params", &self.params.is_some())
            .field("query", &self.query.is_some())
            .field("body", &self.body)
            .finish()
    }
}

/// A documented (method, path) operation.
#[derive(Debug, Clone)]
pub struct OperationRecord {
    /// HTTP method.
    pub method: Method,
    /// Path template.
    pub path: String,
    /// Request description.
    pub request: RequestDescriptor,
    /// Responses keyed by status code string.
    pub responses: IndexMap<String, ResponseDescriptor>,
    /// Explicit operation id.
    pub operation_id: Option<String>,
    /// Short summary.
    pub summary: Option<String>,
    /// Full description.
    pub description: Option<String>,
    /// Grouping tags.
    pub tags: Vec<String>,
    /// Whether the operation is deprecated.
    pub deprecated: bool,
}

impl OperationRecord {
    /// Creates a record with no metadata.
    pub fn new(
        method: Method,
        path: impl Into<String>,
        request: RequestDescriptor,
        responses: IndexMap<String, ResponseDescriptor>,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            request,
            responses,
            operation_id: None,
            summary: None,
            description: None,
            tags: Vec::new(),
            deprecated: false,
        }
    }
}

/// A consistent copy of the registry contents.
#[derive(Clone, Default)]
pub struct RegistrySnapshot {
    /// Named schemas in registration order.
    pub schemas: Vec<(String, SchemaRef)>,
    /// Operations in registration order of their paths.
    pub operations: Vec<OperationRecord>,
}

/// Everything one route documents, committed by
/// [`DocumentRegistry::register_route`] in a single step.
///
/// Operations name their body and response components through
/// [`RouteDocs::operations`], which receives the names assigned to the
/// route's keyed schemas.
pub struct RouteDocs<F> {
    /// Route path template.
    pub path: String,
    /// Route-scoped schemas to publish.
    pub keyed: Vec<(SchemaKind, SchemaRef)>,
    /// Builds the operation records once component names are known.
    pub operations: F,
}

impl<F> fmt::Debug for RouteDocs<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDocs")
            .field("path", &self.path)
            .field("keyed", &self.keyed.iter().map(|(kind, _)| kind).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

struct KeyedEntry {
    name: String,
    schema: SchemaRef,
}

#[derive(Default)]
struct RegistryState {
    schemas: IndexMap<String, SchemaRef>,
    keyed: IndexMap<SchemaKey, KeyedEntry>,
    // Component name -> the key that owns it.
    owners: HashMap<String, SchemaKey>,
    operations: IndexMap<String, IndexMap<Method, OperationRecord>>,
}

impl RegistryState {
    // The name `key` already owns, or the first free one derived from it.
    fn name_for(&self, key: &SchemaKey, pending: &[(SchemaKey, String)]) -> String {
        if let Some(entry) = self.keyed.get(key) {
            return entry.name.clone();
        }
        let base = key.component_name();
        let taken = |name: &str| {
            self.owners.get(name).is_some_and(|owner| owner != key)
                || pending.iter().any(|(other, held)| other != key && held == name)
        };
        let mut name = base.clone();
        let mut n = 2;
        while taken(&name) {
            name = format!("{base}{n}");
            n += 1;
        }
        name
    }
}

/// Shared store of schemas and operations.
///
/// Clones share state. Reads and writes are serialized through a lock, so
/// registration may happen from any thread.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use veritas_core::Shape;
/// use veritas_docs::{DocumentRegistry, SchemaKind};
///
/// let registry = DocumentRegistry::new();
/// let name = registry
///     .register_keyed("/with-schema", SchemaKind::Query, Arc::new(Shape::object([("test", Shape::string())])))
///     .unwrap();
///
/// assert_eq!(name, "WithSchemaQuery");
/// assert!(registry.schema("WithSchemaQuery").is_some());
/// ```
#[derive(Clone, Default)]
pub struct DocumentRegistry {
    state: Arc<RwLock<RegistryState>>,
    policy: ConflictPolicy,
}

impl fmt::Debug for DocumentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("DocumentRegistry")
            .field("policy", &self.policy)
            .field("schemas", &state.schemas.keys().collect::<Vec<_>>())
            .field("operations", &state.operations.values().map(IndexMap::len).sum::<usize>())
            .finish()
    }
}

impl DocumentRegistry {
    /// Creates an empty registry that overwrites on conflict.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry with the given conflict policy.
    #[must_use]
    pub fn with_policy(policy: ConflictPolicy) -> Self {
        Self {
            state: Arc::default(),
            policy,
        }
    }

    /// Returns the conflict policy.
    #[must_use]
    pub const fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Registers a named component schema.
    pub fn register_schema(&self, name: impl Into<String>, schema: SchemaRef) -> DocsResult<()> {
        let name = name.into();
        let mut state = self.state.write();
        if self.check_schema(&state, &name, &schema)? {
            tracing::warn!(schema = %name, "overwriting registered schema");
        }
        state.schemas.insert(name, schema);
        Ok(())
    }

    /// Registers a route-scoped schema and returns its component name.
    ///
    /// A key keeps the name it was first given. Registering the same
    /// schema value again under the same key is a no-op and never
    /// conflicts.
    pub fn register_keyed(
        &self,
        path: impl Into<String>,
        kind: SchemaKind,
        schema: SchemaRef,
    ) -> DocsResult<String> {
        let key = SchemaKey::new(path, kind);
        let mut state = self.state.write();
        let name = state.name_for(&key, &[]);
        let overwrite = self.check_schema(&state, &name, &schema)?;
        Self::commit_keyed(&mut state, key, name.clone(), schema, overwrite);
        Ok(name)
    }

    /// Registers a route's keyed schemas and operations together.
    ///
    /// Every conflict is checked before anything is stored, so a failed
    /// registration leaves the registry as it was.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use http::Method;
    /// use indexmap::IndexMap;
    /// use veritas_core::{SchemaRef, Shape};
    /// use veritas_docs::{
    ///     BodyDescriptor, DocumentRegistry, OperationRecord, RequestDescriptor, RouteDocs,
    ///     SchemaKind,
    /// };
    ///
    /// let registry = DocumentRegistry::new();
    /// let body: SchemaRef = Arc::new(Shape::object([("name", Shape::string())]));
    /// registry
    ///     .register_route(RouteDocs {
    ///         path: "/items".to_string(),
    ///         keyed: vec![(SchemaKind::Body, body)],
    ///         operations: |names: &IndexMap<SchemaKind, String>| {
    ///             let request = RequestDescriptor {
    ///                 body: Some(BodyDescriptor::new(names[&SchemaKind::Body].clone())),
    ///                 ..RequestDescriptor::default()
    ///             };
    ///             vec![OperationRecord::new(Method::POST, "/items", request, IndexMap::new())]
    ///         },
    ///     })
    ///     .unwrap();
    ///
    /// assert!(registry.schema("ItemsBody").is_some());
    /// assert_eq!(registry.operation_count(), 1);
    /// ```
    pub fn register_route<F>(&self, route: RouteDocs<F>) -> DocsResult<()>
    where
        F: FnOnce(&IndexMap<SchemaKind, String>) -> Vec<OperationRecord>,
    {
        let RouteDocs {
            path,
            keyed,
            operations,
        } = route;
        let mut state = self.state.write();

        let mut pending: Vec<(SchemaKey, String)> = Vec::with_capacity(keyed.len());
        let mut overwrites = Vec::with_capacity(keyed.len());
        for (kind, schema) in &keyed {
            let key = SchemaKey::new(path.clone(), *kind);
            let name = state.name_for(&key, &pending);
            overwrites.push(self.check_schema(&state, &name, schema)?);
            pending.push((key, name));
        }

        let names: IndexMap<SchemaKind, String> = pending
            .iter()
            .map(|(key, name)| (key.kind, name.clone()))
            .collect();
        let records = operations(&names);
        for (i, record) in records.iter().enumerate() {
            Self::check_path(&record.path)?;
            self.operation_exists(&state, record)?;
            let repeated = records[..i]
                .iter()
                .any(|other| other.method == record.method && other.path == record.path);
            if repeated && self.policy == ConflictPolicy::Reject {
                return Err(DocsError::operation_conflict(&record.method, &record.path));
            }
        }

        let schemas = keyed.into_iter().map(|(_, schema)| schema);
        for (((key, name), schema), overwrite) in pending.into_iter().zip(schemas).zip(overwrites) {
            Self::commit_keyed(&mut state, key, name, schema, overwrite);
        }
        for record in records {
            Self::commit_operation(&mut state, record);
        }
        Ok(())
    }

    // Ok(true) when storing `schema` under `name` replaces a different one.
    fn check_schema(&self, state: &RegistryState, name: &str, schema: &SchemaRef) -> DocsResult<bool> {
        match state.schemas.get(name) {
            Some(existing) if !Arc::ptr_eq(existing, schema) => match self.policy {
                ConflictPolicy::Reject => Err(DocsError::schema_conflict(name)),
                ConflictPolicy::Overwrite => Ok(true),
            },
            _ => Ok(false),
        }
    }

    fn commit_keyed(
        state: &mut RegistryState,
        key: SchemaKey,
        name: String,
        schema: SchemaRef,
        overwrite: bool,
    ) {
        if overwrite {
            tracing::warn!(schema = %name, path = %key.path, "overwriting registered schema");
        }
        state.schemas.insert(name.clone(), Arc::clone(&schema));
        state.owners.insert(name.clone(), key.clone());
        state.keyed.insert(key, KeyedEntry { name, schema });
    }

    fn check_path(path: &str) -> DocsResult<()> {
        if path.starts_with('/') {
            Ok(())
        } else {
            Err(DocsError::InvalidPath {
                path: path.to_string(),
                reason: "must start with '/'".to_string(),
            })
        }
    }

    // Ok(true) when an operation for the same method and path is stored and
    // the policy allows replacing it.
    fn operation_exists(&self, state: &RegistryState, record: &OperationRecord) -> DocsResult<bool> {
        let exists = state
            .operations
            .get(&record.path)
            .is_some_and(|methods| methods.contains_key(&record.method));
        if exists && self.policy == ConflictPolicy::Reject {
            return Err(DocsError::operation_conflict(&record.method, &record.path));
        }
        Ok(exists)
    }

    fn commit_operation(state: &mut RegistryState, record: OperationRecord) {
        let methods = state.operations.entry(record.path.clone()).or_default();
        if methods.contains_key(&record.method) {
            tracing::warn!(
                method = %record.method,
                path = %record.path,
                "overwriting documented operation"
            );
        }
        methods.insert(record.method.clone(), record);
    }

    /// Records an operation with no extra metadata.
    pub fn register_path(
        &self,
        method: Method,
        path: &str,
        request: RequestDescriptor,
        responses: IndexMap<String, ResponseDescriptor>,
    ) -> DocsResult<()> {
        self.register_operation(OperationRecord::new(method, path, request, responses))
    }

    /// Records an operation.
    pub fn register_operation(&self, record: OperationRecord) -> DocsResult<()> {
        Self::check_path(&record.path)?;
        let mut state = self.state.write();
        self.operation_exists(&state, &record)?;
        Self::commit_operation(&mut state, record);
        Ok(())
    }

    /// Returns a named schema.
    #[must_use]
    pub fn schema(&self, name: &str) -> Option<SchemaRef> {
        self.state.read().schemas.get(name).cloned()
    }

    /// Returns a route-scoped schema.
    #[must_use]
    pub fn keyed(&self, path: &str, kind: SchemaKind) -> Option<SchemaRef> {
        self.state
            .read()
            .keyed
            .get(&SchemaKey::new(path, kind))
            .map(|entry| Arc::clone(&entry.schema))
    }

    /// Returns the component name a route-scoped schema is published under.
    #[must_use]
    pub fn keyed_name(&self, path: &str, kind: SchemaKind) -> Option<String> {
        self.state
            .read()
            .keyed
            .get(&SchemaKey::new(path, kind))
            .map(|entry| entry.name.clone())
    }

    /// Returns the operation recorded for `method` and `path`.
    #[must_use]
    pub fn operation(&self, method: &Method, path: &str) -> Option<OperationRecord> {
        self.state.read().operations.get(path)?.get(method).cloned()
    }

    /// Returns the number of named schemas.
    #[must_use]
    pub fn schema_count(&self) -> usize {
        self.state.read().schemas.len()
    }

    /// Returns the number of recorded operations.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.state
            .read()
            .operations
            .values()
            .map(IndexMap::len)
            .sum()
    }

    /// Returns true if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let state = self.state.read();
        state.schemas.is_empty() && state.operations.is_empty()
    }

    /// Copies the current contents under a single read lock.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        let state = self.state.read();
        RegistrySnapshot {
            schemas: state
                .schemas
                .iter()
                .map(|(name, schema)| (name.clone(), Arc::clone(schema)))
                .collect(),
            operations: state
                .operations
                .values()
                .flat_map(IndexMap::values)
                .cloned()
                .collect(),
        }
    }
}
