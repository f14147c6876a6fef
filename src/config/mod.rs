//! Application configuration module
//!
//! Configuration is read from environment variables with the `BILLING_SYNC`
//! prefix; nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use billing_sync::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod app_store;
mod database;
mod email;
mod error;
mod server;

pub use app_store::AppStoreConfig;
pub use database::DatabaseConfig;
pub use email::EmailConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Notification verification and App Store Connect
    pub app_store: AppStoreConfig,

    /// Billing failure email (Resend)
    #[serde(default)]
    pub email: EmailConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads `.env` if present, then reads `BILLING_SYNC__SECTION__KEY`
    /// variables:
    ///
    /// - `BILLING_SYNC__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `BILLING_SYNC__APP_STORE__MONTHLY_PRODUCT_ID=...` -> `app_store.monthly_product_id`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("BILLING_SYNC")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.app_store.validate()?;
        self.email.validate()?;
        if self.email.send_timeout_secs >= self.server.request_timeout_secs {
            return Err(ValidationError::SendTimeoutExceedsRequestTimeout);
        }
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
