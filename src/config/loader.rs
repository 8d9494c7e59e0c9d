//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{AppConfig, Environment};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value:?}")]
    Env { key: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: optional TOML file, then `.env`, then environment
/// overrides, then validation.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => AppConfig::default(),
    };

    load_dotenv(Path::new(".env"));

    let config = apply_env(config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    tracing::debug!(file = ?path, "Configuration loaded");
    Ok(config)
}

/// Load a dotenv file into the process environment. Variables that are
/// already set win; a missing file is not an error.
pub fn load_dotenv(path: &Path) {
    match dotenv::from_path(path) {
        Ok(()) => tracing::debug!(file = %path.display(), "Loaded dotenv file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(file = %path.display(), error = %e, "Ignoring unreadable dotenv file"),
    }
}

/// Overlay recognised environment variables onto a configuration.
pub fn apply_env<F>(mut config: AppConfig, lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(env) = lookup("NODE_ENV") {
        config.environment = Environment::from_name(&env);
    }
    if let Some(uri) = lookup("MONGODB_URI") {
        config.database.uri = uri;
    }
    if let Some(name) = lookup("MONGODB_DATABASE") {
        config.database.name = name;
    }
    if let Some(port) = lookup("PORT") {
        config.listener.port = parse_var("PORT", port)?;
    }
    if let Some(window) = lookup("RATE_LIMIT_WINDOW_MS") {
        config.rate_limit.window_ms = parse_var("RATE_LIMIT_WINDOW_MS", window)?;
    }
    if let Some(max) = lookup("RATE_LIMIT_MAX_REQUESTS") {
        config.rate_limit.max_requests = parse_var("RATE_LIMIT_MAX_REQUESTS", max)?;
    }
    if let Some(hops) = lookup("TRUST_PROXY_HOPS") {
        config.rate_limit.trust_proxy_hops = parse_var("TRUST_PROXY_HOPS", hops)?;
    }
    if let Some(url) = lookup("MAIL_API_URL") {
        config.mail.api_url = url;
    }
    if let Some(token) = lookup("MAIL_API_TOKEN") {
        config.mail.api_token = token;
    }
    if let Some(sender) = lookup("MAIL_SENDER") {
        config.mail.sender = sender;
    }
    Ok(config)
}

fn parse_var<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { key, value })
}
