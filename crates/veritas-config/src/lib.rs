//! Typed configuration for Veritas services.
//!
//! This crate provides a strongly-typed configuration system with support for:
//! - TOML and JSON configuration files
//! - `.env` files and flat deployment variables (`PORT`, `DB_*`)
//! - Prefixed environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Overview
//!
//! [`VeritasConfig`] holds every section:
//!
//! - [`ServerConfig`] - bind address, shutdown timeout, body size limit
//! - [`DatabaseConfig`] - optional storage connection settings
//! - [`LoggingConfig`] - level, format and decoration of log output
//! - [`MetricsConfig`] - Prometheus exporter
//! - [`DocsConfig`] - where and how the API document is served
//!
//! # Example
//!
//! ```no_run
//! use veritas_config::ConfigLoader;
//!
//! # fn main() -> Result<(), veritas_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_optional_file("veritas.toml")?
//!     .with_dotenv()?
//!     .with_process_env()?
//!     .with_env_prefix("VERITAS")
//!     .load()?;
//!
//! println!("listening on {}", config.server.bind_addr()?);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//! shutdown_timeout_secs = 30
//! max_body_size = 1048576
//!
//! [database]
//! host = "localhost"
//! user = "app"
//! password = "secret"
//! database = "main"
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [metrics]
//! enabled = true
//! addr = "0.0.0.0:9090"
//!
//! [docs]
//! path = "/openapi.json"
//! title = "My API"
//! ```
//!
//! # Environment Variable Overrides
//!
//! With a prefix set, values can be overridden using `PREFIX__SECTION__KEY`:
//!
//! - `VERITAS__SERVER__PORT=9000`
//! - `VERITAS__DATABASE__HOST=db.internal`
//! - `VERITAS__METRICS__ENABLED=true`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
