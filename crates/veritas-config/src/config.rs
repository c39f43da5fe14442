//! Main configuration types.
//!
//! This module provides the top-level [`VeritasConfig`] struct and its builder.

use serde::{Deserialize, Serialize};

use crate::{
    ConfigError, DatabaseConfig, DocsConfig, LogFormat, LoggingConfig, MetricsConfig, ServerConfig,
};

/// Complete Veritas service configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load configuration from files
/// and environment variables.
///
/// # Example
///
/// ```
/// use veritas_config::VeritasConfig;
///
/// let config = VeritasConfig::default();
/// assert_eq!(config.server.port, 8080);
/// assert!(config.database.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct VeritasConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage connection, absent when the service runs without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseConfig>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// API document configuration.
    #[serde(default)]
    pub docs: DocsConfig,
}

impl VeritasConfig {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```
    /// use veritas_config::{ServerConfig, VeritasConfig};
    ///
    /// let config = VeritasConfig::builder()
    ///     .server(ServerConfig {
    ///         port: 3000,
    ///         ..Default::default()
    ///     })
    ///     .build();
    ///
    /// assert_eq!(config.server.port, 3000);
    /// ```
    #[must_use]
    pub fn builder() -> VeritasConfigBuilder {
        VeritasConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `server.host` is not an IP address
    /// - `server.max_body_size` is zero
    /// - a database section is present with an empty field
    /// - metrics are enabled and `metrics.addr` is not a socket address
    /// - `docs.path` does not start with `/`
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.bind_addr()?;

        if self.server.max_body_size == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_size",
                "must be greater than zero",
            ));
        }

        if let Some(database) = &self.database {
            database.validate()?;
        }

        if self.metrics.enabled && self.metrics.addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "metrics.addr",
                format!("invalid socket address: {}", self.metrics.addr),
            ));
        }

        if !self.docs.path.starts_with('/') {
            return Err(ConfigError::invalid_value(
                "docs.path",
                format!("must start with '/': {}", self.docs.path),
            ));
        }

        Ok(())
    }

    /// Development preset: pretty, colored debug logs with source locations.
    ///
    /// ```
    /// use veritas_config::VeritasConfig;
    ///
    /// let config = VeritasConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.ansi_enabled = true;
        config.logging.include_location = true;
        config
    }

    /// Production preset: JSON logs at info and the metrics exporter enabled.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.logging.ansi_enabled = false;
        config.metrics.enabled = true;
        config
    }
}

/// Builder for [`VeritasConfig`].
#[derive(Debug, Default)]
pub struct VeritasConfigBuilder {
    server: Option<ServerConfig>,
    database: Option<DatabaseConfig>,
    logging: Option<LoggingConfig>,
    metrics: Option<MetricsConfig>,
    docs: Option<DocsConfig>,
}

impl VeritasConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server configuration.
    #[must_use]
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.server = Some(server);
        self
    }

    /// Set the database configuration.
    #[must_use]
    pub fn database(mut self, database: DatabaseConfig) -> Self {
        self.database = Some(database);
        self
    }

    /// Set the logging configuration.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Set the metrics configuration.
    #[must_use]
    pub fn metrics(mut self, metrics: MetricsConfig) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Set the docs configuration.
    #[must_use]
    pub fn docs(mut self, docs: DocsConfig) -> Self {
        self.docs = Some(docs);
        self
    }

    /// Build the configuration.
    ///
    /// Any unset sections will use their default values.
    #[must_use]
    pub fn build(self) -> VeritasConfig {
        VeritasConfig {
            server: self.server.unwrap_or_default(),
            database: self.database,
            logging: self.logging.unwrap_or_default(),
            metrics: self.metrics.unwrap_or_default(),
            docs: self.docs.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<VeritasConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
