use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::{env_or, env_required, ConfigError};

const DEFAULT_QUOTE_COLLECTION: &str = "quotes";
const DEFAULT_BOOKING_COLLECTION: &str = "bookings";

/// Connection settings for the document store backing quotes, bookings and
/// the read-only directory collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Overrides the `quotes` collection, mostly for isolated test runs.
    pub quote_collection: Option<String>,
    /// Overrides the `bookings` collection that conversions write into.
    pub booking_collection: Option<String>,
    pub pool_size: u32,
    pub connection_timeout_secs: u64,
}

/// Blank values are treated as unset.
fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl MongoConfig {
    /// Reads `MONGO_URI` and `MONGO_DATABASE` (required), `MONGO_USERNAME`,
    /// `MONGO_PASSWORD`, `MONGO_QUOTE_COLLECTION`, `MONGO_BOOKING_COLLECTION`,
    /// `MONGO_POOL_SIZE` (10) and `MONGO_CONNECTION_TIMEOUT` in seconds (5).
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading MongoDB configuration from environment variables");
        let defaults = MongoConfig::default();

        let config = MongoConfig {
            uri: env_required("MONGO_URI")?,
            database: env_required("MONGO_DATABASE")?,
            username: optional_var("MONGO_USERNAME"),
            password: optional_var("MONGO_PASSWORD"),
            quote_collection: optional_var("MONGO_QUOTE_COLLECTION"),
            booking_collection: optional_var("MONGO_BOOKING_COLLECTION"),
            pool_size: env_or("MONGO_POOL_SIZE", defaults.pool_size)?,
            connection_timeout_secs: env_or("MONGO_CONNECTION_TIMEOUT", defaults.connection_timeout_secs)?,
        };
        debug!(
            database = %config.database,
            quotes = config.quote_collection_name(),
            bookings = config.booking_collection_name(),
            pool_size = config.pool_size,
            authenticated = config.username.is_some(),
            "MongoDB settings resolved"
        );

        config.validate()?;
        info!("MongoDB configuration loaded successfully");
        Ok(config)
    }

    pub fn from_test_env() -> Self {
        MongoConfig {
            database: "test_db".to_string(),
            username: Some("testuser".to_string()),
            password: Some("testpass".to_string()),
            quote_collection: Some("test_quotes".to_string()),
            booking_collection: Some("test_bookings".to_string()),
            pool_size: 2,
            connection_timeout_secs: 2,
            ..MongoConfig::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let problem = if self.uri.trim().is_empty() {
            Some("MongoDB URI cannot be empty")
        } else if !self.uri.starts_with("mongodb://") && !self.uri.starts_with("mongodb+srv://") {
            Some("MongoDB URI must use the mongodb:// or mongodb+srv:// scheme")
        } else if self.database.trim().is_empty() {
            Some("MongoDB database cannot be empty")
        } else if self.pool_size == 0 {
            Some("MongoDB pool size must be greater than 0")
        } else if self.connection_timeout_secs == 0 {
            Some("MongoDB connection timeout must be greater than 0")
        } else if self.username.is_some() != self.password.is_some() {
            Some("MongoDB username and password must be set together")
        } else {
            None
        };

        match problem {
            Some(message) => {
                error!("Invalid MongoDB configuration: {}", message);
                Err(ConfigError::ValidationError(message.to_string()))
            }
            None => Ok(()),
        }
    }

    pub fn get_uri(&self) -> &str {
        &self.uri
    }

    pub fn get_database(&self) -> &str {
        &self.database
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    pub fn quote_collection_name(&self) -> &str {
        self.quote_collection.as_deref().unwrap_or(DEFAULT_QUOTE_COLLECTION)
    }

    pub fn booking_collection_name(&self) -> &str {
        self.booking_collection.as_deref().unwrap_or(DEFAULT_BOOKING_COLLECTION)
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        MongoConfig {
            uri: "mongodb://localhost:27017".to_string(),
            database: "marketplace".to_string(),
            username: None,
            password: None,
            quote_collection: None,
            booking_collection: None,
            pool_size: 10,
            connection_timeout_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MongoConfig::default();
        assert_eq!(config.database, "marketplace");
        assert_eq!(config.quote_collection_name(), "quotes");
        assert_eq!(config.booking_collection_name(), "bookings");
        assert_eq!(config.connection_timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_collection_name_fallbacks() {
        let mut config = MongoConfig::from_test_env();
        assert_eq!(config.quote_collection_name(), "test_quotes");
        assert_eq!(config.booking_collection_name(), "test_bookings");
        config.quote_collection = None;
        config.booking_collection = None;
        assert_eq!(config.quote_collection_name(), "quotes");
        assert_eq!(config.booking_collection_name(), "bookings");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases: [fn(&mut MongoConfig); 6] = [
            |c| c.uri = "  ".to_string(),
            |c| c.uri = "http://localhost:27017".to_string(),
            |c| c.database = String::new(),
            |c| c.pool_size = 0,
            |c| c.connection_timeout_secs = 0,
            |c| c.password = None,
        ];
        for break_it in cases {
            let mut config = MongoConfig::from_test_env();
            assert!(config.validate().is_ok());
            break_it(&mut config);
            assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
        }
    }

    #[test]
    fn test_srv_uri_accepted() {
        let mut config = MongoConfig::from_test_env();
        config.uri = "mongodb+srv://cluster0.example.net".to_string();
        assert!(config.validate().is_ok());
    }
}
