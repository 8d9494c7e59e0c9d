//! EarnMadu API server library.

pub mod auth;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod mail;
pub mod observability;
pub mod routes;
pub mod security;
pub mod store;

pub use config::schema::AppConfig;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
