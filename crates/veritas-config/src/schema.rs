//! Configuration section types.
//!
//! Every section rejects unknown keys and fills missing keys with defaults,
//! so a file only has to mention what it changes.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// HTTP server section.
///
/// # Example
///
/// ```
/// use veritas_config::ServerConfig;
///
/// let config = ServerConfig {
///     port: 3000,
///     ..Default::default()
/// };
/// assert_eq!(config.bind_addr().unwrap().to_string(), "0.0.0.0:3000");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Interface to bind, as an IP address literal.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on. `0` picks a free port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Largest request body accepted, in bytes.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl ServerConfig {
    /// Resolves `host` and `port` into a socket address.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `host` is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.host.parse().map_err(|_| {
            ConfigError::invalid_value(
                "server.host",
                format!("not an IP address: {}", self.host),
            )
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            max_body_size: default_max_body_size(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_max_body_size() -> usize {
    1024 * 1024
}

/// Storage connection settings.
///
/// The framework never opens the connection itself; the settings are handed
/// to whatever client the application injects into the request context.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database server host.
    pub host: String,
    /// User to connect as.
    pub user: String,
    /// Password for `user`.
    pub password: String,
    /// Database name.
    pub database: String,
}

impl DatabaseConfig {
    /// Checks that every field is set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingField` naming the first empty field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("database.host", &self.host),
            ("database.user", &self.user),
            ("database.password", &self.password),
            ("database.database", &self.database),
        ];
        for (name, value) in fields {
            if value.is_empty() {
                return Err(ConfigError::missing_field(name));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error or a full
    /// `EnvFilter` string).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include ANSI color codes in output.
    #[serde(default)]
    pub ansi_enabled: bool,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            ansi_enabled: false,
            include_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Prometheus metrics section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Install the Prometheus exporter.
    #[serde(default)]
    pub enabled: bool,

    /// Address the exporter's scrape endpoint listens on.
    #[serde(default = "default_metrics_addr")]
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_metrics_addr(),
        }
    }
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

/// API document section.
///
/// Defaults match the document generator's own defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DocsConfig {
    /// Serve the generated document.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Route the document is served on.
    #[serde(default = "default_docs_path")]
    pub path: String,

    /// Document title.
    #[serde(default = "default_title")]
    pub title: String,

    /// API version.
    #[serde(default = "default_version")]
    pub version: String,

    /// API description.
    #[serde(default = "default_description")]
    pub description: String,

    /// Server URL listed in the document.
    #[serde(default = "default_server_url")]
    pub server_url: String,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_docs_path(),
            title: default_title(),
            version: default_version(),
            description: default_description(),
            server_url: default_server_url(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_docs_path() -> String {
    "/openapi.json".to_string()
}

fn default_title() -> String {
    "My API".to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_description() -> String {
    "This is the API".to_string()
}

fn default_server_url() -> String {
    "v1".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_body_size, 1024 * 1024);
    }

    #[test]
    fn test_bind_addr_rejects_hostname() {
        let config = ServerConfig {
            host: "localhost".to_string(),
            ..Default::default()
        };
        let err = config.bind_addr().unwrap_err();
        assert!(err.to_string().contains("server.host"));
    }

    #[test]
    fn test_bind_addr_ipv6() {
        let config = ServerConfig {
            host: "::1".to_string(),
            port: 9000,
            ..Default::default()
        };
        assert_eq!(config.bind_addr().unwrap().to_string(), "[::1]:9000");
    }

    #[test]
    fn test_database_debug_hides_password() {
        let db = DatabaseConfig {
            host: "db".into(),
            user: "app".into(),
            password: "hunter2".into(),
            database: "main".into(),
        };
        let debug = format!("{db:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("app"));
    }

    #[test]
    fn test_database_validate_names_empty_field() {
        let db = DatabaseConfig {
            host: "db".into(),
            user: "app".into(),
            password: String::new(),
            database: "main".into(),
        };
        let err = db.validate().unwrap_err();
        assert!(err.to_string().contains("database.password"));
    }

    #[test]
    fn test_docs_defaults() {
        let docs = DocsConfig::default();
        assert!(docs.enabled);
        assert_eq!(docs.path, "/openapi.json");
        assert_eq!(docs.title, "My API");
        assert_eq!(docs.server_url, "v1");
    }

    #[test]
    fn test_log_format_lowercase() {
        let format: LogFormat = serde_json::from_str("\"pretty\"").unwrap();
        assert_eq!(format, LogFormat::Pretty);
    }
}
