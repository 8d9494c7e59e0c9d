//! `/api/v1/videos` routes. Public.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Router,
};
use serde_json::{json, Value};

use crate::http::error::ApiError;
use crate::http::response::Envelope;
use crate::http::server::AppState;
use crate::security::sanitize::CleanPath;
use crate::store::VideoQuery;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_videos))
        .route("/{id}", get(get_video))
}

async fn list_videos(
    State(state): State<AppState>,
    query: Result<Query<VideoQuery>, QueryRejection>,
) -> Result<Envelope<Value>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let videos = state.store.list_videos(&query).await?;

    Ok(Envelope::success(json!({ "videos": videos })).with_results(videos.len()))
}

async fn get_video(
    State(state): State<AppState>,
    CleanPath(id): CleanPath,
) -> Result<Envelope<Value>, ApiError> {
    let video = state
        .store
        .find_video(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No video found with that ID".to_string()))?;

    Ok(Envelope::success(json!({ "video": video })))
}
