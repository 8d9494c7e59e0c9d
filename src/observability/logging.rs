//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` wins over the configured level

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{AppConfig, Environment};

/// Install the global subscriber. Call once, before anything logs.
pub fn init(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    match config.environment {
        Environment::Development => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .init(),
        Environment::Test => registry
            .with(tracing_subscriber::fmt::layer().compact().with_test_writer())
            .init(),
        Environment::Production => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_thread_ids(false),
            )
            .init(),
    }
}
