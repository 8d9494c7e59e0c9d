//! `/api/v1/auth` routes.
//!
//! Account creation and login live in a separate service that shares the
//! session collection; this group only consumes sessions.

use axum::{
    extract::State,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::auth::{protect, AuthUser};
use crate::http::error::ApiError;
use crate::http::response::Envelope;
use crate::http::server::AppState;
use crate::mail::EmailMessage;
use crate::store::User;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/test-email", post(send_test_email))
        .route("/me", get(me))
        .route_layer(middleware::from_fn_with_state(state, protect))
}

/// Send the fixed test message to the caller's own address.
async fn send_test_email(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>, ApiError> {
    let message = EmailMessage::test_message(&user.email);

    if let Err(err) = state.mailer.send(&message).await {
        tracing::error!(user_id = %user.id, error = %err, "Email error");
        return Err(ApiError::Mail(err));
    }

    Ok(Json(json!({
        "status": "success",
        "message": "Test email sent successfully",
    })))
}

async fn me(AuthUser(user): AuthUser) -> Envelope<Value> {
    Envelope::success(json!({ "user": user_json(&user) }))
}

pub(crate) fn user_json(user: &User) -> Value {
    json!({
        "id": user.id,
        "email": user.email,
        "name": user.name,
        "role": user.role,
    })
}
