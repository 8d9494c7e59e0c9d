//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the API.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the API server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Runtime environment (controls error verbosity and log format).
    pub environment: Environment,

    /// Listener configuration (bind host and port).
    pub listener: ListenerConfig,

    /// Document store connection settings.
    pub database: DatabaseConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Request hardening settings.
    pub security: SecurityConfig,

    /// Outbound mail settings.
    pub mail: MailConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
    Test,
}

impl Environment {
    /// Parse the value of `NODE_ENV`. Anything unrecognised is production.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            "test" => Environment::Test,
            _ => Environment::Production,
        }
    }

    /// Whether error bodies may carry internal detail.
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind.
    pub host: String,

    /// Port to listen on.
    pub port: u16,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl ListenerConfig {
    /// `host:port` string suitable for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            request_timeout_secs: 30,
        }
    }
}

/// Document store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection string (e.g. "mongodb+srv://...").
    pub uri: String,

    /// Database name holding the collections.
    pub name: String,

    /// Server selection timeout in milliseconds.
    pub server_selection_timeout_ms: u64,

    /// Socket connect timeout in milliseconds.
    pub socket_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: String::new(),
            name: "earnmadu".to_string(),
            server_selection_timeout_ms: 5_000,
            socket_timeout_ms: 45_000,
        }
    }
}

/// Cross-origin policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Frontend origins permitted to make cross-origin requests.
    pub allowed_origins: Vec<String>,

    /// Methods advertised on preflight responses.
    pub allowed_methods: Vec<String>,

    /// Request headers advertised on preflight responses.
    pub allowed_headers: Vec<String>,

    /// Response headers exposed to the browser.
    pub exposed_headers: Vec<String>,

    /// Whether credentials (cookies) may accompany cross-origin requests.
    pub allow_credentials: bool,

    /// Preflight cache lifetime in seconds.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: [
                "https://earnmadu-frontend.vercel.app",
                "https://earnmadu-frontend-git-main-deepumons-projects.vercel.app",
                "https://earnmadu-frontend-frontend-7igk-df8iz71ks-deepumons-projects.vercel.app",
                "https://earnmadu-frontend-frontend-7igk.vercel.app",
                "http://localhost:3000",
                "http://localhost:5173",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            allowed_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS", "PATCH"]
                .into_iter()
                .map(String::from)
                .collect(),
            allowed_headers: ["Content-Type", "Authorization", "X-Requested-With", "Accept", "Origin"]
                .into_iter()
                .map(String::from)
                .collect(),
            exposed_headers: vec!["Set-Cookie".to_string()],
            allow_credentials: true,
            max_age_secs: 86_400,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Length of the fixed counting window in milliseconds.
    pub window_ms: u64,

    /// Maximum requests per client IP within one window.
    pub max_requests: u32,

    /// Only paths under this prefix are counted.
    pub path_prefix: String,

    /// Number of reverse-proxy hops whose X-Forwarded-For entries are trusted.
    /// Zero means the header is ignored entirely.
    pub trust_proxy_hops: usize,

    /// Interval between sweeps of expired windows, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_ms: 900_000,
            max_requests: 100,
            path_prefix: "/api".to_string(),
            trust_proxy_hops: 0,
            sweep_interval_secs: 60,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable hardening response headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 10 * 1024, // 10kb
        }
    }
}

/// Outbound mail configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MailConfig {
    /// Endpoint of the transactional mail HTTP API.
    pub api_url: String,

    /// Bearer token for the mail API.
    pub api_token: String,

    /// Sender address placed in the `from` field.
    pub sender: String,

    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8025/api/send".to_string(),
            api_token: String::new(),
            sender: "EarnMadu <no-reply@earnmadu.app>".to_string(),
            timeout_ms: 10_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log filter when RUST_LOG is unset.
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "earnmadu_api=info,tower_http=info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
