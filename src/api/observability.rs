use crate::api::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.prometheus_handle.as_ref().map_or_else(
        || (StatusCode::NOT_FOUND, "Metrics not enabled".to_string()),
        |handle| (StatusCode::OK, handle.render()),
    )
}

/// Coarse route class for metric labels. Episode paths carry ids, so they are
/// never used as labels directly.
fn route_class(path: &str) -> &'static str {
    match path {
        "/" | "/search" | "/filter" => "catalog",
        "/metrics" => "metrics",
        p if p.starts_with("/download/") => "download",
        p if p.starts_with("/api/") => "episode",
        _ => "static",
    }
}

/// Wraps each request in a span with a fresh request id and records the
/// time until the response head is ready.
///
/// Download bodies are still relaying when this returns. Their full duration
/// and outcome are recorded by the relay as `stream_relay_duration_seconds`.
pub async fn request_logging(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let class = route_class(req.uri().path());

    let span = info_span!(
        "request",
        request_id = %Uuid::new_v4(),
        method = %req.method(),
        path = %req.uri().path(),
        class,
    );

    async move {
        let response = next.run(req).await;
        let status = response.status();
        let head_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let labels = [("class", class.to_string()), ("status", status.as_u16().to_string())];
        metrics::counter!("http_requests_total", &labels).increment(1);
        metrics::histogram!("http_response_head_seconds", &labels)
            .record(started.elapsed().as_secs_f64());

        if status.is_server_error() {
            warn!(status = status.as_u16(), head_ms, "Request failed");
        } else {
            info!(status = status.as_u16(), head_ms, "Response head sent");
        }

        response
    }
    .instrument(span)
    .await
}
