//! Configuration module for Teahouse.

use serde::Deserialize;
use std::path::Path;

use crate::auth::MAX_SESSION_LIFETIME_HOURS;
use crate::{Result, TeahouseError};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum accepted request body in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/teahouse.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Lifetime of a session created without "remember me", in hours.
    #[serde(default = "default_session_lifetime")]
    pub lifetime_hours: i64,
    /// Interval of the expired-session purge task in seconds (0 = disabled).
    #[serde(default)]
    pub purge_interval_secs: u64,
}

fn default_session_lifetime() -> i64 {
    24
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lifetime_hours: default_session_lifetime(),
            purge_interval_secs: 0,
        }
    }
}

/// Read-through cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Whether session and principal lookups are cached.
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Entry time-to-live in seconds.
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. Empty means console only.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/teahouse.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Web API configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WebConfig {
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Session configuration.
    #[serde(default)]
    pub session: SessionConfig,
    /// Cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Web API configuration.
    #[serde(default)]
    pub web: WebConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| TeahouseError::Config(format!("parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `TEAHOUSE_DATABASE_PATH`
    /// - `TEAHOUSE_HOST`
    /// - `TEAHOUSE_PORT` (ignored when not a valid port)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("TEAHOUSE_DATABASE_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
        if let Ok(host) = std::env::var("TEAHOUSE_HOST") {
            if !host.is_empty() {
                self.server.host = host;
            }
        }
        if let Ok(port) = std::env::var("TEAHOUSE_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid TEAHOUSE_PORT"),
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(TeahouseError::Config(
                "database.path must not be empty".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(TeahouseError::Config(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.session.lifetime_hours <= 0 {
            return Err(TeahouseError::Config(
                "session.lifetime_hours must be positive".to_string(),
            ));
        }
        if self.session.lifetime_hours > MAX_SESSION_LIFETIME_HOURS {
            return Err(TeahouseError::Config(format!(
                "session.lifetime_hours must be at most {MAX_SESSION_LIFETIME_HOURS}"
            )));
        }
        if self.cache.enabled && self.cache.ttl_secs == 0 {
            return Err(TeahouseError::Config(
                "cache.ttl_secs must be positive when the cache is enabled".to_string(),
            ));
        }
        Ok(())
    }
}
