//! # Veritas
//!
//! **One schema, three uses: request validation, typed handler input and
//! OpenAPI documentation.**
//!
//! Routes are declared on an [`App`] together with the schemas for their
//! path parameters, query and body. Registration records those schemas in a
//! [`DocumentRegistry`](veritas_docs::DocumentRegistry) and binds the
//! handler to them, so the handler can only run on input the document
//! describes.
//!
//! ## Quick Start
//!
//! ```rust
//! use serde::Deserialize;
//! use serde_json::Value;
//! use veritas::prelude::*;
//!
//! #[derive(Deserialize)]
//! struct Search {
//!     test: String,
//! }
//!
//! let mut app = App::new();
//! app.get(
//!     "/with-schema",
//!     |ctx: TypedContext<Value, Search, Value>| async move {
//!         ApiResult::Ok(format!("searching for {}", ctx.query.test))
//!     },
//!     RouteSpec::new().query(Shape::object([("test", Shape::string())]).typed::<Search>()),
//! )
//! .unwrap();
//! app.serve_docs("/openapi.json", DocumentGenerator::new()).unwrap();
//!
//! let doc = DocumentGenerator::new().generate(app.registry());
//! assert!(doc.paths.contains_key("/with-schema"));
//! ```
//!
//! ## Request flow
//!
//! ```text
//! transport → decode query/body → RouteTable → bound handler
//!                                                   │
//!                      params → query → body ───────┤ first failure → 400
//!                                                   ↓
//!                                           handler(TypedContext)
//! ```

#![doc(html_root_url = "https://docs.rs/veritas/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
mod binder;
pub mod decode;
mod dispatcher;
mod error;
mod route;

pub use app::{App, STANDARD_METHODS};
pub use binder::{bind, BoundHandler, BoxedReply, RouteSchemas, VALIDATION_FAILURES_METRIC};
pub use dispatcher::{Dispatcher, RouteTable};
pub use error::RegisterError;
pub use route::{ResponseSpec, RouteDocs, RouteSpec};

// Re-export the member crates
pub use veritas_core as core;
pub use veritas_docs as docs;
pub use veritas_router as router;

/// Prelude module for convenient imports.
///
/// ```rust
/// use veritas::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{bind, App, RouteSchemas, RouteSpec};
    pub use veritas_core::{
        ApiError, ApiResult, IntoReply, Json, Passthrough, Reply, RequestContext, Schema, Shape,
        Typed, TypedContext, ValidationError,
    };
    pub use veritas_docs::{ConflictPolicy, DocumentGenerator, DocumentRegistry};
}
