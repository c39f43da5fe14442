//! Route declarations.

use std::fmt;
use std::sync::Arc;

use veritas_core::{Describe, Passthrough, Schema, SchemaRef};

use crate::binder::RouteSchemas;

/// A documented response.
#[derive(Clone)]
pub struct ResponseSpec {
    /// Status code.
    pub status: u16,
    /// Response description.
    pub description: String,
    /// Body schema, if the response has a documented body.
    pub schema: Option<SchemaRef>,
}

impl fmt::Debug for ResponseSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseSpec")
            .field("status", &self.status)
            .field("description", &self.description)
            .field("schema", &self.schema.is_some())
            .finish()
    }
}

/// Documentation that does not take part in validation.
#[derive(Debug, Clone)]
pub struct RouteDocs {
    /// Whether the body must be present.
    pub body_required: bool,
    /// Body description.
    pub body_description: Option<String>,
    /// Responses in declaration order.
    pub responses: Vec<ResponseSpec>,
    /// Short summary.
    pub summary: Option<String>,
    /// Full description.
    pub description: Option<String>,
    /// Grouping tags.
    pub tags: Vec<String>,
    /// Explicit operation id.
    pub operation_id: Option<String>,
    /// Whether the operation is deprecated.
    pub deprecated: bool,
}

impl Default for RouteDocs {
    fn default() -> Self {
        Self {
            body_required: true,
            body_description: None,
            responses: Vec::new(),
            summary: None,
            description: None,
            tags: Vec::new(),
            operation_id: None,
            deprecated: false,
        }
    }
}

impl RouteDocs {
    fn is_empty(&self) -> bool {
        self.responses.is_empty()
            && self.summary.is_none()
            && self.description.is_none()
            && self.tags.is_empty()
            && self.operation_id.is_none()
            && !self.deprecated
    }
}

/// Everything declared for a route besides its handler.
///
/// # Example
///
/// ```
/// use veritas::RouteSpec;
/// use veritas_core::Shape;
///
/// let test = Shape::object([("test", Shape::string())]);
/// let spec = RouteSpec::new()
///     .body(test.clone())
///     .body_description("the test payload")
///     .response(200, "Echoes the payload", test)
///     .summary("Echo");
///
/// assert!(spec.is_documented());
/// assert!(!RouteSpec::new().is_documented());
/// ```
#[derive(Debug, Clone)]
pub struct RouteSpec<P = Passthrough, Q = Passthrough, B = Passthrough> {
    /// Request section schemas.
    pub schemas: RouteSchemas<P, Q, B>,
    /// Documentation metadata.
    pub docs: RouteDocs,
}

impl RouteSpec {
    /// A route with no schemas and no documentation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schemas: RouteSchemas::new(),
            docs: RouteDocs::default(),
        }
    }
}

impl Default for RouteSpec {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, Q, B> RouteSpec<P, Q, B> {
    /// Declares the path parameter schema.
    pub fn params<S: Schema>(self, schema: S) -> RouteSpec<S, Q, B> {
        RouteSpec {
            schemas: self.schemas.params(schema),
            docs: self.docs,
        }
    }

    /// Declares the query schema.
    pub fn query<S: Schema>(self, schema: S) -> RouteSpec<P, S, B> {
        RouteSpec {
            schemas: self.schemas.query(schema),
            docs: self.docs,
        }
    }

    /// Declares the body schema.
    pub fn body<S: Schema>(self, schema: S) -> RouteSpec<P, Q, S> {
        RouteSpec {
            schemas: self.schemas.body(schema),
            docs: self.docs,
        }
    }

    /// Marks the body as optional in the document.
    #[must_use]
    pub fn body_optional(mut self) -> Self {
        self.docs.body_required = false;
        self
    }

    /// Describes the body.
    #[must_use]
    pub fn body_description(mut self, description: impl Into<String>) -> Self {
        self.docs.body_description = Some(description.into());
        self
    }

    /// Documents a response with a JSON body.
    #[must_use]
    pub fn response(
        mut self,
        status: u16,
        description: impl Into<String>,
        schema: impl Describe + 'static,
    ) -> Self {
        self.docs.responses.push(ResponseSpec {
            status,
            description: description.into(),
            schema: Some(Arc::new(schema)),
        });
        self
    }

    /// Documents a response without a body.
    #[must_use]
    pub fn empty_response(mut self, status: u16, description: impl Into<String>) -> Self {
        self.docs.responses.push(ResponseSpec {
            status,
            description: description.into(),
            schema: None,
        });
        self
    }

    /// Sets the summary.
    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.docs.summary = Some(summary.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.docs.description = Some(description.into());
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.docs.tags.push(tag.into());
        self
    }

    /// Sets the operation id.
    #[must_use]
    pub fn operation_id(mut self, id: impl Into<String>) -> Self {
        self.docs.operation_id = Some(id.into());
        self
    }

    /// Marks the operation as deprecated.
    #[must_use]
    pub fn deprecated(mut self) -> Self {
        self.docs.deprecated = true;
        self
    }
}

impl<P, Q, B> RouteSpec<P, Q, B>
where
    P: Schema + 'static,
    Q: Schema + 'static,
    B: Schema + 'static,
{
    /// Returns true if registering this route touches the document registry.
    #[must_use]
    pub fn is_documented(&self) -> bool {
        self.schemas.is_declared() || !self.docs.is_empty()
    }
}
