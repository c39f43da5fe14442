//! # Veritas Server
//!
//! HTTP transport for a Veritas [`App`](veritas::App).
//!
//! - HTTP/1.1 via Hyper
//! - Query and body decoding ahead of route validation
//! - Request ids, structured request logs and Prometheus request metrics
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! The `veritas-demo` binary in this crate wires configuration, telemetry
//! and a small set of documented routes together.
//!
//! ## Example
//!
//! ```rust,no_run
//! use veritas::App;
//! use veritas_config::VeritasConfig;
//! use veritas_server::{Server, ShutdownSignal};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = VeritasConfig::development();
//!     let server = Server::new(App::new(), &config.server)?;
//!
//!     let shutdown = ShutdownSignal::new();
//!     server.run_with_shutdown(shutdown).await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/veritas-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod demo;
pub mod response;
mod server;
mod shutdown;

pub use response::{HttpResponse, REQUEST_ID_HEADER};
pub use server::{handle_request, Server, ServerError};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
