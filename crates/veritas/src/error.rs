//! Route registration errors.

use thiserror::Error;
use veritas_docs::DocsError;

/// Errors raised while registering a route.
#[derive(Debug, Error)]
pub enum RegisterError {
    /// The document registry refused a schema or operation.
    #[error(transparent)]
    Docs(#[from] DocsError),

    /// The dispatcher refused the route.
    #[error("failed to register {method} {path}: {source}")]
    Dispatcher {
        /// Route method.
        method: String,
        /// Route path.
        path: String,
        /// The dispatcher's error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl RegisterError {
    pub(crate) fn dispatcher(
        method: &http::Method,
        path: &str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Dispatcher {
            method: method.to_string(),
            path: path.to_string(),
            source: Box::new(source),
        }
    }
}
