//! Radix tree route table for Veritas.
//!
//! The table stores one value per (method, path template) pair and matches
//! concrete request paths against it, extracting named parameters.
//!
//! - **Path Parameters**: `/users/{id}`
//! - **Wildcards**: `/files/*path`, which must be the last segment
//! - **Overwrite on re-registration**: inserting an existing (method, path)
//!   replaces the earlier value
//!
//! # Architecture
//!
//! ```text
//!                    (root)
//!                      │
//!              ┌───────┴───────┐
//!              │               │
//!            "users"        "files"
//!              │               │
//!        ┌─────┴─────┐        "*path"
//!        │           │
//!       (leaf)    "{id}"
//!   [GET,POST]      │
//!                 (leaf)
//!              [GET,DELETE]
//! ```

mod method_router;
mod node;
mod params;
mod router;

use http::Method;
use thiserror::Error;

pub use method_router::MethodRouter;
pub use node::{Node, SegmentKind};
pub use params::{IntoIter as ParamsIntoIter, Params};
pub use router::Router;

/// A matched route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a, T> {
    /// The value registered for the route.
    pub value: &'a T,
    /// The route template that matched, e.g. `/users/{id}`.
    pub template: &'a str,
    /// Extracted path parameters.
    pub params: Params,
}

/// The outcome of [`Router::lookup`].
#[derive(Debug)]
pub enum Lookup<'a, T> {
    /// Path and method matched.
    Found(RouteMatch<'a, T>),
    /// The path matched but the method did not.
    MethodNotAllowed(Vec<Method>),
    /// No route for the path.
    NotFound,
}

/// Errors raised while registering a route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// A `*name` segment was followed by more segments.
    #[error("wildcard must be the last segment in '{path}'")]
    WildcardNotLast {
        /// The offending route template.
        path: String,
    },

    /// Two routes use different names for the same parameter position.
    #[error("parameter '{new}' in '{path}' conflicts with existing '{existing}'")]
    ConflictingParameter {
        /// The route being registered.
        path: String,
        /// The segment already in the tree.
        existing: String,
        /// The segment being registered.
        new: String,
    },
}
