//! `/api/v1/earnings` routes. All protected.

use axum::{extract::State, middleware, routing::get, Router};
use serde_json::{json, Value};

use crate::auth::{protect, AuthUser};
use crate::http::error::ApiError;
use crate::http::response::Envelope;
use crate::http::server::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_earnings))
        .route_layer(middleware::from_fn_with_state(state, protect))
}

/// The caller's earnings, newest first, with the running total.
async fn list_earnings(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Envelope<Value>, ApiError> {
    let earnings = state.store.list_earnings(&user.id).await?;
    let total_cents: i64 = earnings.iter().map(|e| e.amount_cents).sum();

    Ok(Envelope::success(json!({
        "earnings": earnings,
        "totalCents": total_cents,
    }))
    .with_results(earnings.len()))
}
