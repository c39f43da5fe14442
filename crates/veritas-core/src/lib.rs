//! # Veritas Core
//!
//! Core types shared by every Veritas crate.
//!
//! - [`Schema`] and [`Describe`]: the contract a validator must satisfy
//! - [`Shape`]: the built-in declarative validator, also used for documents
//! - [`Typed`] and [`Passthrough`]: typed and absent schemas
//! - [`ValidationError`]: field-level diagnostics
//! - [`RequestContext`] and [`TypedContext`]: a request before and after validation
//! - [`Capabilities`]: values injected into every request, such as a storage client
//! - [`ApiError`] and [`Reply`]: what handlers return

#![doc(html_root_url = "https://docs.rs/veritas-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod capabilities;
mod context;
mod error;
mod reply;
pub mod schema;
pub mod shape;
mod validation;

pub use capabilities::Capabilities;
pub use context::{RequestContext, RequestId, RequestMeta, TypedContext};
pub use error::{ApiError, ApiResult, ErrorCategory, ErrorDetail, ErrorEnvelope};
pub use reply::{IntoReply, Json, Reply, ReplyBody};
pub use schema::{Describe, Passthrough, Schema, SchemaRef, Typed};
pub use shape::{Shape, ShapeKind};
pub use validation::{Issue, Section, ValidationError};
