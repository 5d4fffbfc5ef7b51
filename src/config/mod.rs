//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `TAPROOM` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use taproom_realtime::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {:?}", config.server.socket_addr());
//! ```

mod database;
mod error;
mod push;
mod realtime;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use push::PushConfig;
pub use realtime::RealtimeConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL for push subscriptions. Absent means in-memory.
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Web push (VAPID) configuration
    #[serde(default)]
    pub push: PushConfig,

    /// Heartbeat and reconnect timing
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `TAPROOM` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `TAPROOM__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `TAPROOM__DATABASE__URL=...` -> `database.url = ...`
    /// - `TAPROOM__PUSH__VAPID_PRIVATE_KEY=...` -> `push.vapid_private_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("TAPROOM")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        if let Some(database) = &self.database {
            database.validate()?;
        }
        self.push.validate()?;
        self.realtime.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
