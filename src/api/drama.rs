use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;

use super::negotiate::prefers_json;
use super::views::{PlayerView, render_player};
use super::{ApiError, ApiResponse, AppState, EpisodePayload};

pub async fn get_title(
    State(state): State<Arc<AppState>>,
    Path((slug, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    resolve_and_render(&state, &slug, &id, None, &headers).await
}

pub async fn get_episode(
    State(state): State<Arc<AppState>>,
    Path((slug, id, episode_no)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    resolve_and_render(&state, &slug, &id, Some(&episode_no), &headers).await
}

async fn resolve_and_render(
    state: &AppState,
    slug: &str,
    id: &str,
    episode_no: Option<&str>,
    headers: &HeaderMap,
) -> Result<Response, ApiError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiError::validation("Title id is required"));
    }

    let resolution = state.shared.resolver.resolve(id, episode_no).await?;

    if prefers_json(headers) {
        let payload = EpisodePayload::from(&resolution);
        return Ok(Json(ApiResponse::success(payload)).into_response());
    }

    let view = PlayerView::new(id, slug, &resolution);
    Ok(Html(render_player(&view)).into_response())
}
