//! # Veritas Docs
//!
//! OpenAPI documentation derived from the same schemas that validate
//! requests.
//!
//! This crate provides:
//! - **[`DocumentRegistry`]**: a shared store of component schemas and
//!   documented operations, filled in during route registration
//! - **[`DocumentGenerator`]**: renders the registry as an OpenAPI 3.0
//!   document
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use http::Method;
//! use indexmap::IndexMap;
//! use veritas_core::Shape;
//! use veritas_docs::{
//!     DocumentGenerator, DocumentRegistry, RequestDescriptor, SchemaKind,
//! };
//!
//! let registry = DocumentRegistry::new();
//! let query = Arc::new(Shape::object([("test", Shape::string())]));
//! registry.register_keyed("/with-schema", SchemaKind::Query, query.clone()).unwrap();
//! registry
//!     .register_path(
//!         Method::GET,
//!         "/with-schema",
//!         RequestDescriptor { query: Some(query), ..Default::default() },
//!         IndexMap::new(),
//!     )
//!     .unwrap();
//!
//! let json = DocumentGenerator::new().generate_json(&registry).unwrap();
//! assert!(json.contains("\"/with-schema\""));
//! ```

mod document;
mod error;
mod generator;
mod registry;

pub use document::{
    Components, Contact, Info, License, MediaType, OpenApi, Operation, Parameter, ParameterIn,
    PathItem, RequestBody, Response, Schema, SchemaType, Server, COMPONENT_SCHEMA_PREFIX,
};
pub use error::{DocsError, DocsResult};
pub use generator::{extract_path_parameters, DocumentGenerator, JSON_MEDIA_TYPE};
pub use registry::{
    BodyDescriptor, ConflictPolicy, DocumentRegistry, OperationRecord, RegistrySnapshot,
    RequestDescriptor, ResponseDescriptor, RouteDocs, SchemaKey, SchemaKind,
};
