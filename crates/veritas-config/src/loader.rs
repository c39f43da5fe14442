//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for loading configuration from
//! multiple sources: defaults, files, `.env` files and environment variables.

use std::env;
use std::fs;
use std::path::Path;

use crate::{ConfigError, DatabaseConfig, LogFormat, VeritasConfig};

/// The flat variables a deployment sets without a prefix.
const PORT_VAR: &str = "PORT";
const DB_VARS: [&str; 4] = ["DB_HOST", "DB_USER", "DB_PASSWORD", "DB_DATABASE"];

/// Configuration loader with layered approach.
///
/// Later layers override earlier ones:
/// 1. Default values (built into the code)
/// 2. Configuration file (TOML or JSON)
/// 3. Flat process variables (`PORT`, `DB_*`) via [`with_process_env`](Self::with_process_env)
/// 4. Prefixed variables (`PREFIX__SECTION__KEY`), applied by [`load`](Self::load)
///
/// # Example
///
/// ```no_run
/// use veritas_config::ConfigLoader;
///
/// # fn main() -> Result<(), veritas_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_optional_file("veritas.toml")?
///     .with_dotenv()?
///     .with_process_env()?
///     .with_env_prefix("VERITAS")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: VeritasConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader seeded with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: VeritasConfig::default(),
            env_prefix: None,
        }
    }

    /// Reset to default configuration values.
    ///
    /// `new()` already starts from defaults; chain this for clarity.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = VeritasConfig::default();
        self
    }

    /// Start from the development preset.
    ///
    /// ```
    /// use veritas_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = VeritasConfig::development();
        self
    }

    /// Start from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = VeritasConfig::production();
        self
    }

    /// Load configuration from a file.
    ///
    /// The format is chosen by extension: `.toml` or `.json`. Sections the
    /// file leaves out take their defaults, not the values of earlier layers.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The file does not exist
    /// - The file cannot be read
    /// - The extension is not `toml` or `json`
    /// - The file contains invalid TOML/JSON or unknown fields
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        self.config = Self::parse_file(&content, path)?;
        tracing::debug!(path = %path.display(), "loaded configuration file");

        Ok(self)
    }

    /// Load configuration from a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be read or parsed.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in the given format (`toml` or `json`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the format is unknown or parsing fails.
    ///
    /// # Example
    ///
    /// ```
    /// use veritas_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [server]
    ///     port = 3000
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.server.port, 3000);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => return Err(ConfigError::unsupported_format(format)),
        };
        Ok(self)
    }

    /// Load a `.env` file from the current directory or its parents into
    /// the process environment. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if a file was found but is malformed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        }
        Ok(self)
    }

    /// Load a specific `.env` file into the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file is missing or malformed.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        dotenvy::from_path(path.as_ref())?;
        Ok(self)
    }

    /// Apply the flat deployment variables.
    ///
    /// - `PORT` sets `server.port`
    /// - `DB_HOST`, `DB_USER`, `DB_PASSWORD` and `DB_DATABASE` set the
    ///   database section. They come as a set: if any is present, all four
    ///   must be.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EnvParseError` if `PORT` is not a port number,
    /// or `ConfigError::MissingField` naming the first absent `DB_*`
    /// variable.
    pub fn with_process_env(mut self) -> Result<Self, ConfigError> {
        self.apply_process_vars(|name| env::var(name).ok())?;
        Ok(self)
    }

    /// Set environment variable prefix for overrides.
    ///
    /// Environment variables use the format `PREFIX__SECTION__KEY`.
    /// For example, with prefix "VERITAS":
    /// - `VERITAS__SERVER__PORT=9000`
    /// - `VERITAS__LOGGING__FORMAT=pretty`
    /// - `VERITAS__DOCS__TITLE=Inventory`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Finalize and return the loaded configuration.
    ///
    /// Applies prefixed environment overrides (if a prefix was set) and
    /// validates the result.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override cannot be parsed or validation
    /// fails.
    ///
    /// # Example
    ///
    /// ```
    /// use veritas_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().load().unwrap();
    /// assert_eq!(config.server.port, 8080);
    /// ```
    pub fn load(mut self) -> Result<VeritasConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars: Vec<(String, String)> = env::vars()
                .filter(|(k, _)| k.starts_with(&prefix))
                .collect();
            for (key, value) in vars {
                self.apply_env_var(&key, &value, &prefix)?;
            }
        }

        self.config.validate()?;

        Ok(self.config)
    }

    /// Finalize without validation.
    ///
    /// Prefixed overrides are not applied either.
    #[must_use]
    pub fn load_unvalidated(self) -> VeritasConfig {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> Result<VeritasConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::unsupported_format(path.display().to_string())),
        }
    }

    fn apply_process_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(PORT_VAR) {
            self.config.server.port = parse_port(PORT_VAR, &port)?;
        }

        let values = DB_VARS.map(|name| lookup(name));
        if values.iter().all(Option::is_none) {
            return Ok(());
        }

        let mut fields = Vec::with_capacity(DB_VARS.len());
        for (name, value) in DB_VARS.iter().zip(values) {
            fields.push(value.ok_or_else(|| ConfigError::missing_field(*name))?);
        }
        let [host, user, password, database]: [String; 4] = fields
            .try_into()
            .map_err(|_| ConfigError::missing_field("DB_*"))?;

        self.config.database = Some(DatabaseConfig {
            host,
            user,
            password,
            database,
        });
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let key_without_prefix = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

        let parts: Vec<&str> = key_without_prefix.split("__").collect();

        match parts.as_slice() {
            // Server section
            ["SERVER", "HOST"] => {
                self.config.server.host = value.to_string();
            }
            ["SERVER", "PORT"] => {
                self.config.server.port = parse_port(key, value)?;
            }
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                self.config.server.shutdown_timeout_secs = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }
            ["SERVER", "MAX_BODY_SIZE"] => {
                self.config.server.max_body_size = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }

            // Database section, created on first use
            ["DATABASE", field @ ("HOST" | "USER" | "PASSWORD" | "DATABASE")] => {
                let database = self.config.database.get_or_insert_with(DatabaseConfig::default);
                let value = value.to_string();
                match *field {
                    "HOST" => database.host = value,
                    "USER" => database.user = value,
                    "PASSWORD" => database.password = value,
                    _ => database.database = value,
                }
            }

            // Logging section
            ["LOGGING", "LEVEL"] => {
                self.config.logging.level = value.to_string();
            }
            ["LOGGING", "FORMAT"] => {
                self.config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["LOGGING", "ANSI_ENABLED"] => {
                self.config.logging.ansi_enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["LOGGING", "INCLUDE_LOCATION"] => {
                self.config.logging.include_location = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }

            // Metrics section
            ["METRICS", "ENABLED"] => {
                self.config.metrics.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["METRICS", "ADDR"] => {
                self.config.metrics.addr = value.to_string();
            }

            // Docs section
            ["DOCS", "ENABLED"] => {
                self.config.docs.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["DOCS", "PATH"] => self.config.docs.path = value.to_string(),
            ["DOCS", "TITLE"] => self.config.docs.title = value.to_string(),
            ["DOCS", "VERSION"] => self.config.docs.version = value.to_string(),
            ["DOCS", "DESCRIPTION"] => self.config.docs.description = value.to_string(),
            ["DOCS", "SERVER_URL"] => self.config.docs.server_url = value.to_string(),

            _ => {
                tracing::warn!(var = key, "ignoring unknown configuration variable");
            }
        }

        Ok(())
    }
}

fn parse_port(var: &str, value: &str) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse_error(var, "expected a port number (0-65535)"))
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_loader_defaults() {
        let config = ConfigLoader::new().with_defaults().load().unwrap();
        assert_eq!(config.server.port, 8080);
        assert!(config.database.is_none());
    }

    #[test]
    fn test_loader_with_production() {
        let config = ConfigLoader::new().with_production().load().unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_loader_with_string_json() {
        let json = r#"{"server": {"port": 3000}, "docs": {"title": "Inventory"}}"#;

        let config = ConfigLoader::new()
            .with_string(json, "json")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.docs.title, "Inventory");
        assert_eq!(config.docs.version, "1.0.0");
    }

    #[test]
    fn test_loader_with_string_unknown_format() {
        let err = ConfigLoader::new().with_string("", "yaml").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_loader_with_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
            [server]
            port = 4000

            [database]
            host = "db.internal"
            user = "app"
            password = "secret"
            database = "main"
            "#
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_file(file.path())
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.database.unwrap().host, "db.internal");
    }

    #[test]
    fn test_loader_with_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"logging": {{"level": "warn", "format": "pretty"}}}}"#).unwrap();

        let config = ConfigLoader::new()
            .with_file(file.path())
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_loader_rejects_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::new().with_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_loader_rejects_unknown_key_in_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[server]\nlisten = \"0.0.0.0\"").unwrap();
        let err = ConfigLoader::new().with_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::TomlError(_)));
    }

    #[test]
    fn test_loader_with_file_not_found() {
        let err = ConfigLoader::new()
            .with_file("/nonexistent/veritas.toml")
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_loader_with_optional_file_not_found() {
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/veritas.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_load_validates() {
        let err = ConfigLoader::new()
            .with_string("[docs]\npath = \"openapi.json\"", "toml")
            .unwrap()
            .load()
            .unwrap_err();
        assert!(err.to_string().contains("docs.path"));
    }

    #[test]
    fn test_load_unvalidated_skips_checks() {
        let config = ConfigLoader::new()
            .with_string("[server]\nmax_body_size = 0", "toml")
            .unwrap()
            .load_unvalidated();
        assert_eq!(config.server.max_body_size, 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dotenv_file_populates_process_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "VERITAS_DOTENV_TEST_VALUE=from-dotenv").unwrap();

        ConfigLoader::new().with_dotenv_file(file.path()).unwrap();
        assert_eq!(
            std::env::var("VERITAS_DOTENV_TEST_VALUE").unwrap(),
            "from-dotenv"
        );
    }

    #[test]
    fn test_process_vars_port_coerced() {
        let env = vars(&[("PORT", "3000")]);
        let mut loader = ConfigLoader::new();
        loader.apply_process_vars(|k| env.get(k).cloned()).unwrap();
        assert_eq!(loader.config.server.port, 3000);
        assert!(loader.config.database.is_none());
    }

    #[test]
    fn test_process_vars_bad_port() {
        let env = vars(&[("PORT", "eighty")]);
        let mut loader = ConfigLoader::new();
        let err = loader.apply_process_vars(|k| env.get(k).cloned()).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_process_vars_full_database() {
        let env = vars(&[
            ("DB_HOST", "localhost"),
            ("DB_USER", "root"),
            ("DB_PASSWORD", "pw"),
            ("DB_DATABASE", "app"),
        ]);
        let mut loader = ConfigLoader::new();
        loader.apply_process_vars(|k| env.get(k).cloned()).unwrap();

        let db = loader.config.database.unwrap();
        assert_eq!(db.host, "localhost");
        assert_eq!(db.user, "root");
        assert_eq!(db.password, "pw");
        assert_eq!(db.database, "app");
    }

    #[test]
    fn test_process_vars_partial_database_rejected() {
        let env = vars(&[("DB_HOST", "localhost"), ("DB_USER", "root")]);
        let mut loader = ConfigLoader::new();
        let err = loader.apply_process_vars(|k| env.get(k).cloned()).unwrap_err();
        match err {
            ConfigError::MissingField { field } => assert_eq!(field, "DB_PASSWORD"),
            other => panic!("expected missing field, got {other:?}"),
        }
    }

    #[test]
    fn test_apply_env_var_sections() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST__SERVER__PORT", "9000", "TEST").unwrap();
        loader.apply_env_var("TEST__LOGGING__FORMAT", "pretty", "TEST").unwrap();
        loader.apply_env_var("TEST__METRICS__ENABLED", "yes", "TEST").unwrap();
        loader.apply_env_var("TEST__DOCS__TITLE", "Inventory", "TEST").unwrap();

        assert_eq!(loader.config.server.port, 9000);
        assert_eq!(loader.config.logging.format, LogFormat::Pretty);
        assert!(loader.config.metrics.enabled);
        assert_eq!(loader.config.docs.title, "Inventory");
    }

    #[test]
    fn test_apply_env_var_database_created_on_demand() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST__DATABASE__HOST", "db", "TEST").unwrap();
        let db = loader.config.database.as_ref().unwrap();
        assert_eq!(db.host, "db");
        assert!(db.user.is_empty());
        assert!(loader.config.validate().is_err());
    }

    #[test]
    fn test_apply_env_var_invalid_values() {
        let mut loader = ConfigLoader::new();
        assert!(loader.apply_env_var("TEST__SERVER__PORT", "70000", "TEST").is_err());
        assert!(loader.apply_env_var("TEST__LOGGING__FORMAT", "xml", "TEST").is_err());
        assert!(loader.apply_env_var("TEST__METRICS__ENABLED", "maybe", "TEST").is_err());
    }

    #[test]
    fn test_apply_env_var_unknown_key_ignored() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST__NOPE__X", "1", "TEST").unwrap();
        assert_eq!(loader.config, VeritasConfig::default());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("True"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("OFF"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }
}
