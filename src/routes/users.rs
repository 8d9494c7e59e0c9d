//! `/api/v1/users` routes.

use axum::{
    extract::State,
    middleware,
    routing::get,
    Router,
};
use serde_json::{json, Value};

use crate::auth::{protect, AuthUser};
use crate::http::error::ApiError;
use crate::http::response::Envelope;
use crate::http::server::AppState;
use crate::security::sanitize::CleanPath;
use crate::routes::auth::user_json;
use crate::store::Role;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/{id}", get(get_user))
        .route_layer(middleware::from_fn_with_state(state, protect))
}

async fn get_me(AuthUser(user): AuthUser) -> Envelope<Value> {
    Envelope::success(json!({ "user": user_json(&user) }))
}

/// Admins may read anyone; everyone else only themselves.
async fn get_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    CleanPath(id): CleanPath,
) -> Result<Envelope<Value>, ApiError> {
    if caller.role != Role::Admin && caller.id != id {
        return Err(ApiError::Forbidden);
    }

    let user = state
        .store
        .find_user(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No user found with that ID".to_string()))?;

    Ok(Envelope::success(json!({ "user": user_json(&user) })))
}
