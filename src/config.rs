/// Service configuration loader - parses floplan.toml
///
/// Keeps ports, upstream endpoints, timeouts, and planning defaults out of
/// the code so they can be tuned without recompiling. Secrets never live in
/// this file: `DATABASE_URL` and `MAPBOX_TOKEN` come from the environment
/// (or `.env`, loaded by `dotenv`).
///
/// Every key is optional. A missing file means built-in defaults; a file
/// that exists but does not parse is an error.

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;

use crate::logging::LogLevel;
use crate::sources::routing::MAPBOX_BASE_URL;
use crate::sources::usgs::IV_BASE_URL;
use crate::sources::usgs_stats::STAT_BASE_URL;

pub const DEFAULT_CONFIG_PATH: &str = "floplan.toml";

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub sources: SourcesConfig,
    pub planning: PlanningConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Request worker threads.
    pub workers: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub usgs_iv_base_url: String,
    pub usgs_stat_base_url: String,
    pub mapbox_base_url: String,
    /// Applies to every outbound HTTP request.
    pub request_timeout_secs: u64,
    /// PostgreSQL `statement_timeout` for the service connection.
    pub statement_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    pub default_vessel_slug: String,
    /// A governing gauge farther upstream than this raises an accuracy warning.
    pub accuracy_distance_miles: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { port: 8080, workers: 8 }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        SourcesConfig {
            usgs_iv_base_url: IV_BASE_URL.to_string(),
            usgs_stat_base_url: STAT_BASE_URL.to_string(),
            mapbox_base_url: MAPBOX_BASE_URL.to_string(),
            request_timeout_secs: 10,
            statement_timeout_ms: 5_000,
        }
    }
}

impl Default for PlanningConfig {
    fn default() -> Self {
        PlanningConfig {
            default_vessel_slug: "canoe".to_string(),
            accuracy_distance_miles: 15.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            file: None,
            timestamps: true,
        }
    }
}

impl ServiceConfig {
    /// Minimum log level; `validate` guarantees it parses.
    pub fn log_level(&self) -> LogLevel {
        LogLevel::parse(&self.logging.level).unwrap_or(LogLevel::Info)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.workers == 0 {
            return Err(ConfigError::Invalid("server.workers must be at least 1".into()));
        }
        if self.sources.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "sources.request_timeout_secs must be at least 1".into(),
            ));
        }
        if !self.planning.accuracy_distance_miles.is_finite() || self.planning.accuracy_distance_miles < 0.0 {
            return Err(ConfigError::Invalid(
                "planning.accuracy_distance_miles must be a non-negative number".into(),
            ));
        }
        if self.planning.default_vessel_slug.trim().is_empty() {
            return Err(ConfigError::Invalid("planning.default_vessel_slug must not be empty".into()));
        }
        if LogLevel::parse(&self.logging.level).is_none() {
            return Err(ConfigError::Invalid(format!(
                "logging.level '{}' is not one of debug, info, warning, error",
                self.logging.level
            )));
        }
        Ok(())
    }
}

/// Configuration loading error
#[derive(Debug)]
pub enum ConfigError {
    /// The file exists but could not be read
    Read(String, io::Error),
    /// The file is not valid TOML or has wrongly typed keys
    Parse(String, String),
    /// Values parsed but are out of range
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read(path, e) => write!(f, "Failed to read {}: {}", path, e),
            ConfigError::Parse(path, e) => write!(f, "Failed to parse {}: {}", path, e),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parses configuration from TOML text.
pub fn parse_config(contents: &str, origin: &str) -> Result<ServiceConfig, ConfigError> {
    let config: ServiceConfig = toml::from_str(contents)
        .map_err(|e| ConfigError::Parse(origin.to_string(), e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from `path`, falling back to defaults when the file
/// does not exist.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let origin = path.display().to_string();
    match fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents, &origin),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ServiceConfig::default()),
        Err(e) => Err(ConfigError::Read(origin, e)),
    }
}
