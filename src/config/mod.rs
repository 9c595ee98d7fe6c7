pub mod app_conf;
pub mod mongo_conf;
pub mod quote_conf;

pub use app_conf::AppConfig;
pub use mongo_conf::MongoConfig;
pub use quote_conf::QuoteConfig;

use std::env;
use tracing::{error, warn};

/// Common configuration error type
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Read `key` and parse it, or fall back to `default` when the variable is unset.
/// A set but unparsable value is an error, never silently replaced.
pub(crate) fn env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse::<T>().map_err(|_| {
            error!("Invalid {} value: {}", key, raw);
            ConfigError::InvalidValue(format!("Invalid {} value", key))
        }),
        Err(_) => {
            warn!("{} not set, using default: {}", key, default);
            Ok(default)
        }
    }
}

/// Required variable; missing is an error.
pub(crate) fn env_required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| {
        error!("{} environment variable not found", key);
        ConfigError::EnvVarNotFound(key.to_string())
    })
}
