//! EarnMadu API server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id ─▶ trace span ─▶ pipeline ───────────────┐
//!                                                 security headers         │
//!                                                 cors gate                │
//!                                                 rate limit (/api)        │
//!                                                 body parser (10 KB)      │
//!                                                 cookie parser            │
//!                                                 sanitizer                │
//!                                                                          ▼
//!     Client Response                                            ┌──────────────┐
//!     ◀────────────── error formatter ◀── stage headers ◀────────│ routes/auth  │
//!                                                                │ routes/users │──▶ MongoDB
//!                                                                │ routes/...   │──▶ mail API
//!                                                                └──────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use earnmadu_api::config::load_config;
use earnmadu_api::lifecycle::{self, Shutdown, ShutdownReason};
use earnmadu_api::mail::HttpMailer;
use earnmadu_api::observability::{logging, metrics};
use earnmadu_api::store::MongoStore;
use earnmadu_api::{AppConfig, AppState, HttpServer};

#[derive(Parser)]
#[command(name = "earnmadu-api")]
#[command(about = "EarnMadu HTTP API server", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Environment variables override it.
    #[arg(short, long, env = "EARNMADU_CONFIG")]
    config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    // Loading config also loads `.env` into the process environment, so it
    // runs before any runtime threads exist.
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    logging::init(&config);
    lifecycle::install_panic_hook();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start async runtime");
            std::process::exit(1);
        }
    };

    let reason = runtime.block_on(serve(config));
    tracing::info!(?reason, "Shutdown complete");
    std::process::exit(reason.exit_code());
}

async fn serve(config: AppConfig) -> ShutdownReason {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.environment,
        "earnmadu-api starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        request_timeout_secs = config.listener.request_timeout_secs,
        rate_limit_max = config.rate_limit.max_requests,
        rate_limit_window_ms = config.rate_limit.window_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let store = match MongoStore::connect(&config.database).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database");
            return ShutdownReason::Fatal;
        }
    };

    let mailer = match HttpMailer::new(&config.mail) {
        Ok(mailer) => mailer,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build mail client");
            return ShutdownReason::Fatal;
        }
    };

    let bind_address = config.listener.bind_address();
    let listener = match TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %bind_address, error = %e, "Failed to bind listener");
            return ShutdownReason::Fatal;
        }
    };

    let shutdown = Shutdown::new();
    lifecycle::spawn_guarded(
        "signals",
        shutdown.clone(),
        lifecycle::signals::listen(shutdown.clone()),
    );

    let state = AppState::new(config, Arc::new(store), Arc::new(mailer));
    let server = HttpServer::new(state);

    if let Err(e) = server.run(listener, shutdown.clone()).await {
        tracing::error!(error = %e, "UNHANDLED REJECTION! Server error, shutting down...");
        shutdown.trigger(ShutdownReason::Fatal);
    }

    shutdown.reason().unwrap_or(ShutdownReason::Signal)
}
