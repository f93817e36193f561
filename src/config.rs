//! Service configuration.
//!
//! Configuration is read from a TOML file and/or the environment and passed
//! explicitly to whatever builds the record source and the service. Nothing
//! here is global.
//!
//! ```toml
//! [database]
//! host = "localhost"
//! port = 5436
//! name = "malaria_db"
//!
//! [forecast]
//! default_steps = 12
//! order = { p = 1, d = 1, q = 1 }
//!
//! [logging]
//! level = "info"
//! ```

use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::analysis::ForecastConfig;
use crate::logging::{self, LogLevel};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// PostgreSQL connection settings.
///
/// When `url` is set it wins over the individual fields.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    /// Table holding the surveillance records.
    pub table: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5436,
            name: "malaria_db".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            table: "malaria_records".to_string(),
        }
    }
}

impl DatabaseConfig {
    /// Connection string for `postgres::Client::connect`.
    pub fn connection_string(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        let mut params = format!(
            "host={} port={} dbname={} user={}",
            self.host, self.port, self.name, self.user
        );
        if !self.password.is_empty() {
            params.push_str(&format!(" password={}", self.password));
        }
        params
    }

    /// Applies `DATABASE_URL` and `DB_HOST`, `DB_PORT`, `DB_NAME`, `DB_USER`,
    /// `DB_PASSWORD` from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|key| env::var(key).ok())
    }

    fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.url = Some(url);
        }
        if let Some(host) = lookup("DB_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("DB_PORT") {
            self.port = port.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "DB_PORT".to_string(),
                reason: format!("'{}' is not a port number", port),
            })?;
        }
        if let Some(name) = lookup("DB_NAME") {
            self.name = name;
        }
        if let Some(user) = lookup("DB_USER") {
            self.user = user;
        }
        if let Some(password) = lookup("DB_PASSWORD") {
            self.password = password;
        }
        Ok(())
    }
}

/// Logger settings, handed to `logging::init_logger`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: None,
            timestamps: true,
        }
    }
}

impl LoggingConfig {
    /// Installs the global logger with these settings.
    pub fn init_logger(&self) {
        logging::init_logger(self.level, self.file.as_deref(), self.timestamps);
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub database: DatabaseConfig,
    pub forecast: ForecastConfig,
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus `.env` and process environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let mut config = ServiceConfig::default();
        config.database.apply_env()?;
        Ok(config)
    }

    /// Checks values that deserialize fine but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, reason: String| ConfigError::Invalid {
            key: key.to_string(),
            reason,
        };
        let forecast = &self.forecast;

        forecast
            .order
            .validate()
            .map_err(|e| invalid("forecast.order", e.to_string()))?;
        if forecast.max_steps == Some(0) {
            return Err(invalid("forecast.max_steps", "must be positive".to_string()));
        }
        if forecast.default_steps == 0 {
            return Err(invalid("forecast.default_steps", "must be positive".to_string()));
        }
        if let Some(max) = forecast.max_steps.filter(|&max| forecast.default_steps > max) {
            return Err(invalid(
                "forecast.default_steps",
                format!("must not exceed max_steps ({})", max),
            ));
        }
        if forecast.max_iterations == 0 {
            return Err(invalid("forecast.max_iterations", "must be positive".to_string()));
        }
        if !(forecast.tolerance > 0.0 && forecast.tolerance.is_finite()) {
            return Err(invalid(
                "forecast.tolerance",
                "must be a positive finite number".to_string(),
            ));
        }
        if self.database.table.is_empty()
            || !self
                .database
                .table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            return Err(invalid(
                "database.table",
                format!("'{}' is not a plain table name", self.database.table),
            ));
        }
        Ok(())
    }
}

/// Loads a TOML config file, then applies `.env` and environment overrides
/// for the database section.
pub fn load_config(path: impl AsRef<Path>) -> Result<ServiceConfig, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut config = ServiceConfig::from_toml_str(&text)?;
    dotenv::dotenv().ok();
    config.database.apply_env()?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
