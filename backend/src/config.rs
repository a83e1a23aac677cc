//! Configuration management for the point-of-sale backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with POS_ prefix

use chrono::FixedOffset;
use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Session authentication configuration
    pub auth: AuthConfig,

    /// Store-level business settings
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Seconds to wait for a free connection
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Secret key for signing session tokens
    pub session_secret: String,

    /// Session lifetime in seconds
    pub session_ttl_seconds: i64,

    /// Name of the session cookie
    pub cookie_name: String,

    /// Mark the cookie Secure (HTTPS only)
    pub secure_cookie: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Offset of the store's local time from UTC, in minutes (-360 = UTC-6)
    pub utc_offset_minutes: i32,

    /// Active products at or below this stock are reported as low
    pub low_stock_threshold: i32,

    /// Page size for paginated listings when the client sends none
    pub default_page_size: u32,
}

impl StoreConfig {
    /// The configured offset as a chrono offset
    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            ConfigError::Message(format!(
                "store.utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            ))
        })
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("POS_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("auth.session_ttl_seconds", 43200)?
            .set_default("auth.cookie_name", "pos_session")?
            .set_default("auth.secure_cookie", false)?
            .set_default("store.utc_offset_minutes", -360)?
            .set_default("store.low_stock_threshold", 10)?
            .set_default("store.default_page_size", 10)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (POS_ prefix)
            .add_source(
                Environment::with_prefix("POS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.store.utc_offset()?;
        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: -360,
            low_stock_threshold: shared::DEFAULT_LOW_STOCK_THRESHOLD,
            default_page_size: 10,
        }
    }
}
