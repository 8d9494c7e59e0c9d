//! API route table.
//!
//! ```text
//! /health                        liveness + store ping (not rate limited)
//! /api/v1/auth/test-email  POST  protected
//! /api/v1/auth/me          GET   protected
//! /api/v1/users/me         GET   protected
//! /api/v1/users/{id}       GET   protected, admin or self
//! /api/v1/videos           GET   public
//! /api/v1/videos/{id}      GET   public
//! /api/v1/earnings         GET   protected
//! ```

pub mod auth;
pub mod earnings;
pub mod users;
pub mod videos;

use axum::{
    extract::State,
    http::{Method, Uri},
    routing::get,
    Router,
};
use serde_json::{json, Value};

use crate::http::error::ApiError;
use crate::http::response::Envelope;
use crate::http::server::AppState;

pub fn api_router(state: AppState) -> Router<AppState> {
    let v1 = Router::new()
        .nest("/auth", auth::router(state.clone()))
        .nest("/users", users::router(state.clone()))
        .nest("/videos", videos::router())
        .nest("/earnings", earnings::router(state));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", v1)
}

async fn health(State(state): State<AppState>) -> Result<Envelope<Value>, ApiError> {
    state.store.ping().await?;
    Ok(Envelope::success(json!({
        "environment": state.config.environment,
        "database": "up",
    })))
}

/// Fallback for any path no route matched.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("Can't find {} on this server!", uri.path()))
}

/// Fallback for a known path hit with an unsupported method.
pub async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    ApiError::MethodNotAllowed {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}
