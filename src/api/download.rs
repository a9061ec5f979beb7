use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use super::AppState;
use crate::services::{DownloadKind, ProxiedStream, StreamError, StreamRequest};

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
struct SubtitleErrorBody {
    error: String,
    details: String,
}

const fn status_for(err: &StreamError) -> StatusCode {
    if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Subtitle route failures are JSON `{error, details}`.
fn subtitle_error(err: &StreamError) -> Response {
    let status = status_for(err);
    let error = if status == StatusCode::BAD_REQUEST {
        "The url parameter is required and must be an http(s) URL."
    } else {
        warn!(error = %err, "Subtitle download failed");
        "Failed to download the file from its source."
    };

    let body = SubtitleErrorBody {
        error: error.to_string(),
        details: err.to_string(),
    };
    (status, Json(body)).into_response()
}

/// Media route failures are plain text.
fn media_error(err: &StreamError) -> Response {
    let status = status_for(err);
    let message = if status == StatusCode::BAD_REQUEST {
        "A video url is required."
    } else {
        warn!(error = %err, "Media download failed");
        "Failed to download the video."
    };
    (status, message).into_response()
}

fn stream_response(stream: ProxiedStream) -> Response {
    let content_type = stream.headers.content_type.clone();
    let disposition = stream.headers.content_disposition.clone();
    let content_length = stream.content_length_header();

    let mut response = (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        stream.into_body(),
    )
        .into_response();

    if let Some(length) = content_length {
        response.headers_mut().insert(header::CONTENT_LENGTH, length);
    }
    response
}

async fn proxy(state: &AppState, raw: Option<&str>, kind: DownloadKind) -> Result<Response, StreamError> {
    let request = StreamRequest::parse(raw, kind)?;
    let stream = state.shared.proxy.open(&request).await?;
    Ok(stream_response(stream))
}

pub async fn download_subtitle(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DownloadParams>,
) -> Response {
    proxy(&state, params.url.as_deref(), DownloadKind::Subtitle)
        .await
        .unwrap_or_else(|e| subtitle_error(&e))
}

pub async fn download_media(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DownloadParams>,
) -> Response {
    let kind = DownloadKind::Media {
        prefix: state.shared.config().stream.download_prefix.clone(),
    };

    proxy(&state, params.url.as_deref(), kind)
        .await
        .unwrap_or_else(|e| media_error(&e))
}
