use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, error, info, warn};

use crate::config::{env_or, ConfigError};

/// Business knobs of the quote lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteConfig {
    /// Prefix of generated quote numbers (`QT` gives `QT-20260101-042`)
    pub number_prefix: String,
    /// Validity window applied when a quote is persisted without `validUntil`
    pub default_validity_days: i64,
    /// How many generated numbers to try before giving up on a collision
    pub number_max_attempts: u32,
    /// How many times a read-modify-write is replayed after a concurrent write
    pub conflict_retries: u32,
    /// Page size used by listings when the caller gives none
    pub default_page_limit: i64,
    /// Upper bound on a caller supplied page size
    pub max_page_limit: i64,
}

impl QuoteConfig {
    /// Load quote configuration from environment variables
    ///
    /// - QUOTE_NUMBER_PREFIX (defaults to QT)
    /// - QUOTE_DEFAULT_VALIDITY_DAYS (defaults to 30)
    /// - QUOTE_NUMBER_MAX_ATTEMPTS (defaults to 3)
    /// - QUOTE_CONFLICT_RETRIES (defaults to 3)
    /// - QUOTE_DEFAULT_PAGE_LIMIT (defaults to 50)
    /// - QUOTE_MAX_PAGE_LIMIT (defaults to 200)
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading quote configuration from environment variables");
        let defaults = QuoteConfig::default();

        let number_prefix = env::var("QUOTE_NUMBER_PREFIX").unwrap_or_else(|_| {
            warn!("QUOTE_NUMBER_PREFIX not set, using default: {}", defaults.number_prefix);
            defaults.number_prefix.clone()
        });
        let default_validity_days = env_or("QUOTE_DEFAULT_VALIDITY_DAYS", defaults.default_validity_days)?;
        let number_max_attempts = env_or("QUOTE_NUMBER_MAX_ATTEMPTS", defaults.number_max_attempts)?;
        let conflict_retries = env_or("QUOTE_CONFLICT_RETRIES", defaults.conflict_retries)?;
        let default_page_limit = env_or("QUOTE_DEFAULT_PAGE_LIMIT", defaults.default_page_limit)?;
        let max_page_limit = env_or("QUOTE_MAX_PAGE_LIMIT", defaults.max_page_limit)?;

        let config = QuoteConfig {
            number_prefix,
            default_validity_days,
            number_max_attempts,
            conflict_retries,
            default_page_limit,
            max_page_limit,
        };
        debug!(?config, "Quote configuration parsed");

        config.validate()?;
        info!("Quote configuration loaded successfully");
        Ok(config)
    }

    pub fn from_test_env() -> Self {
        QuoteConfig {
            number_prefix: "QT".to_string(),
            default_validity_days: 30,
            number_max_attempts: 3,
            conflict_retries: 3,
            default_page_limit: 50,
            max_page_limit: 200,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.number_prefix.is_empty() || !self.number_prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            error!("Quote number prefix is invalid: {:?}", self.number_prefix);
            return Err(ConfigError::ValidationError(
                "Quote number prefix must be non-empty and alphanumeric".to_string(),
            ));
        }
        if self.default_validity_days <= 0 {
            return Err(ConfigError::ValidationError(
                "Default validity must be at least one day".to_string(),
            ));
        }
        if self.number_max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "Quote number attempts must be greater than 0".to_string(),
            ));
        }
        if self.default_page_limit <= 0 || self.max_page_limit < self.default_page_limit {
            return Err(ConfigError::ValidationError(
                "Page limits must be positive and max >= default".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for QuoteConfig {
    fn default() -> Self {
        QuoteConfig::from_test_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = QuoteConfig::default();
        assert_eq!(config.number_prefix, "QT");
        assert_eq!(config.default_validity_days, 30);
        assert_eq!(config.default_page_limit, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_prefix() {
        let mut config = QuoteConfig::default();
        config.number_prefix = "Q-T".to_string();
        assert!(config.validate().is_err());
        config.number_prefix = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_validity() {
        let mut config = QuoteConfig::default();
        config.default_validity_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_page_limits() {
        let mut config = QuoteConfig::default();
        config.max_page_limit = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = QuoteConfig::default();
        config.number_max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
