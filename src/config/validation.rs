//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows > 0, ports valid)
//! - Check required connection settings are present
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::AppConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("database.uri is required (set MONGODB_URI)")]
    MissingDatabaseUri,

    #[error("database.uri must use the mongodb:// or mongodb+srv:// scheme")]
    InvalidDatabaseScheme,

    #[error("rate_limit.{0} must be greater than zero")]
    ZeroRateLimit(&'static str),

    #[error("security.max_body_size must be greater than zero")]
    ZeroBodyLimit,

    #[error("cors.allowed_origins contains an invalid origin: {0}")]
    InvalidOrigin(String),

    #[error("mail.api_url is not a valid URL: {0}")]
    InvalidMailUrl(String),
}

/// Check a loaded configuration, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let uri = config.database.uri.trim();
    if uri.is_empty() {
        errors.push(ValidationError::MissingDatabaseUri);
    } else if !(uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://")) {
        errors.push(ValidationError::InvalidDatabaseScheme);
    }

    if config.rate_limit.enabled {
        if config.rate_limit.window_ms == 0 {
            errors.push(ValidationError::ZeroRateLimit("window_ms"));
        }
        if config.rate_limit.max_requests == 0 {
            errors.push(ValidationError::ZeroRateLimit("max_requests"));
        }
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    for origin in &config.cors.allowed_origins {
        if !is_valid_origin(origin) {
            errors.push(ValidationError::InvalidOrigin(origin.clone()));
        }
    }

    if Url::parse(&config.mail.api_url).is_err() {
        errors.push(ValidationError::InvalidMailUrl(config.mail.api_url.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// An origin is scheme + host (+ port) with no path, as browsers send it.
fn is_valid_origin(origin: &str) -> bool {
    match Url::parse(origin) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some()
                && !origin.ends_with('/')
                && url.path() == "/"
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AppConfig {
        let mut config = AppConfig::default();
        config.database.uri = "mongodb://localhost:27017".to_string();
        config
    }

    #[test]
    fn test_defaults_with_uri_are_valid() {
        assert_eq!(validate_config(&valid()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AppConfig::default();
        config.rate_limit.max_requests = 0;
        config.cors.allowed_origins.push("https://bad.example/".to_string());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::MissingDatabaseUri,
                ValidationError::ZeroRateLimit("max_requests"),
                ValidationError::InvalidOrigin("https://bad.example/".to_string()),
            ]
        );
    }

    #[test]
    fn test_rejects_non_mongo_scheme() {
        let mut config = valid();
        config.database.uri = "postgres://localhost".to_string();
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::InvalidDatabaseScheme])
        );
    }
}
