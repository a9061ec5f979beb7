use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, Response, StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use shortplay::config::Config;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tower::ServiceExt;

const BIG_CHUNK: usize = 64 * 1024;
const BIG_CHUNKS: usize = 512;

// ============================================================================
// Fake upstream
// ============================================================================

#[derive(Clone, Default)]
struct Upstream {
    flaky_hits: Arc<AtomicU32>,
    endless_dropped: Arc<AtomicBool>,
}

struct TestServer {
    base_url: String,
    state: Upstream,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    async fn new() -> Self {
        let state = Upstream::default();
        let router = Router::new()
            .route("/api/drama/search/query", get(search))
            .route("/api/drama/filter/query", get(filter))
            .route("/api/drama/classes/constant", get(constants))
            .route("/api/drama/{id}", get(title))
            .route("/media/flaky/{failures}/clip.mp4", get(flaky))
            .route("/media/big.bin", get(big))
            .route("/media/endless.mp4", get(endless))
            .route("/subs/plain.vtt", get(untyped_subtitle))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let server = axum::serve(listener, router).with_graceful_shutdown(async {
            shutdown_rx.await.ok();
        });
        tokio::spawn(async move {
            server.await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

async fn search() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": [{
            "shortPlayId": "42",
            "shortPlayName": "Hidden Heir",
            "shortPlayCover": "https://img/42.jpg",
            "shotIntroduce": "intro",
            "labelNames": ["CEO"]
        }]
    }))
}

async fn filter() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {"dataList": [{"shortPlayId": "42", "shortPlayName": "Hidden Heir"}], "maxOffset": 7}
    }))
}

async fn constants() -> Json<Value> {
    Json(json!({"success": true, "data": {"data": {"tags": ["Semua"]}}}))
}

async fn title(Path(id): Path<String>) -> Json<Value> {
    match id.as_str() {
        "42" => Json(json!({
            "success": true,
            "data": {
                "dramaInfo": {
                    "shortPlayName": "Hidden Heir",
                    "shortPlayCover": "https://img/42.jpg",
                    "shortPlayLabels": ["CEO", "Romance"],
                    "shortIntroduce": "A long story"
                },
                "result": [],
                "shortPlayEpisodeInfos": [
                    {"episodeNo": 1, "playVoucher": "https://v/1.mp4", "likeNums": 11},
                    {
                        "episodeNo": "3",
                        "videoUrl": "https://v/3.mp4",
                        "subtitleList": [{"url": "https://s/3.vtt"}],
                        "likeNums": 33,
                        "chaseNums": 4,
                        "playClarity": "720p"
                    }
                ]
            }
        })),
        "empty" => Json(json!({
            "success": true,
            "data": {"dramaInfo": {"shortPlayName": "Nothing yet"}, "result": []}
        })),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(json!({"success": true, "data": {}}))
        }
        _ => Json(json!({"success": false, "message": "not found"})),
    }
}

async fn flaky(State(state): State<Upstream>, Path(failures): Path<u32>) -> impl IntoResponse {
    let hit = state.flaky_hits.fetch_add(1, Ordering::SeqCst) + 1;
    if hit <= failures {
        return (StatusCode::SERVICE_UNAVAILABLE, "try again").into_response();
    }
    ([(header::CONTENT_TYPE, "video/mp4")], "clip-bytes").into_response()
}

async fn big() -> impl IntoResponse {
    let chunks = futures::stream::iter(
        (0..BIG_CHUNKS).map(|i| Ok::<_, std::io::Error>(vec![(i % 251) as u8; BIG_CHUNK])),
    );
    ([(header::CONTENT_TYPE, "application/x-test")], Body::from_stream(chunks))
}

/// Sets its flag when the upstream server drops the response body.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

async fn endless(State(state): State<Upstream>) -> impl IntoResponse {
    let flag = DropFlag(state.endless_dropped.clone());
    let chunks = futures::stream::unfold(flag, |flag| async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Some((Ok::<_, std::io::Error>(vec![7u8; 1024]), flag))
    });
    ([(header::CONTENT_TYPE, "video/mp4")], Body::from_stream(chunks))
}

/// Raw upstream that promises 1000 bytes, sends 10, then closes the connection.
async fn spawn_truncating_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                let head = "HTTP/1.1 200 OK\r\nContent-Type: video/mp4\r\nContent-Length: 1000\r\n\r\n";
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(b"0123456789").await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}")
}

async fn untyped_subtitle() -> Response<Body> {
    Response::new(Body::from("WEBVTT\n\n00:00.000 --> 00:01.000\nhi\n"))
}

// ============================================================================
// App under test
// ============================================================================

fn spawn_app(upstream_base: &str) -> Router {
    let mut config = Config::default();
    config.upstream.base_url = upstream_base.to_string();
    config.upstream.request_timeout_seconds = 1;
    config.stream.max_retries = 2;
    config.stream.attempt_timeout_seconds = 2;
    config.observability.metrics_enabled = false;
    config.server.public_path = "does-not-exist".to_string();

    let state = shortplay::api::create_app_state_from_config(config, None)
        .expect("Failed to create app state");
    shortplay::api::router(state)
}

async fn send_get(app: &Router, uri: &str, accept: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(accept) = accept {
        builder = builder.header(header::ACCEPT, accept);
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn body_text(response: Response<Body>) -> String {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(body.to_vec()).unwrap()
}

fn encode(url: &str) -> String {
    url::form_urlencoded::byte_serialize(url.as_bytes()).collect()
}

// ============================================================================
// Episode resolution
// ============================================================================

#[tokio::test]
async fn test_episode_json_selects_requested_episode() {
    let server = TestServer::new().await;
    let app = spawn_app(&server.base_url);

    let response = send_get(&app, "/api/hidden-heir/42/3", Some("application/json")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    let data = &body["data"];
    assert_eq!(data["shortPlayName"], "Hidden Heir");
    assert_eq!(data["shotIntroduce"], "A long story");
    assert_eq!(data["shortPlayLabels"], json!(["CEO", "Romance"]));
    assert_eq!(data["episodeNo"], "3");
    assert_eq!(data["playVoucher"], "https://v/3.mp4");
    assert_eq!(data["subtitleUrl"], "https://s/3.vtt");
    assert_eq!(data["likeNums"], 33);
    assert_eq!(data["chaseNums"], 4);
    assert_eq!(data["playClarity"], "720p");
}

#[tokio::test]
async fn test_episode_falls_back_to_first() {
    let server = TestServer::new().await;
    let app = spawn_app(&server.base_url);

    for uri in ["/api/hidden-heir/42/99", "/api/hidden-heir/42"] {
        let body = body_json(send_get(&app, uri, Some("application/json")).await).await;
        assert_eq!(body["data"]["episodeNo"], 1);
        assert_eq!(body["data"]["playVoucher"], "https://v/1.mp4");
        assert!(body["data"]["subtitleUrl"].is_null());
    }
}

#[tokio::test]
async fn test_episode_empty_list_is_not_an_error() {
    let server = TestServer::new().await;
    let app = spawn_app(&server.base_url);

    let response = send_get(&app, "/api/x/empty/1", Some("application/json")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let data = body_json(response).await["data"].clone();
    assert_eq!(data["shortPlayName"], "Nothing yet");
    for field in ["episodeNo", "playVoucher", "subtitleUrl", "likeNums", "chaseNums", "playClarity"] {
        assert!(data[field].is_null(), "{field} should be null");
    }
}

#[tokio::test]
async fn test_episode_renders_html_for_browsers() {
    let server = TestServer::new().await;
    let app = spawn_app(&server.base_url);

    let response = send_get(&app, "/api/hidden-heir/42/3", Some("text/html,*/*;q=0.8")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));

    let html = body_text(response).await;
    assert!(html.contains("Hidden Heir"));
    assert!(html.contains("/download/api/sub?url=https%3A%2F%2Fs%2F3.vtt"));
    assert!(html.contains("href=\"/api/hidden-heir/42/1\""));
}

#[tokio::test]
async fn test_unknown_title_is_500_with_message() {
    let server = TestServer::new().await;
    let app = spawn_app(&server.base_url);

    let response = send_get(&app, "/api/x/nope/1", Some("application/json")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let server = TestServer::new().await;
    let app = spawn_app(&server.base_url);

    let response = send_get(&app, "/api/x/slow", Some("application/json")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("timed out"));
}

// ============================================================================
// Catalog passthrough
// ============================================================================

#[tokio::test]
async fn test_search_projects_results() {
    let server = TestServer::new().await;
    let app = spawn_app(&server.base_url);

    let body = body_json(send_get(&app, "/search?q=heir", None).await).await;
    assert_eq!(
        body,
        json!({
            "success": true,
            "data": [{"id": "42", "name": "Hidden Heir", "cover": "https://img/42.jpg", "intro": "intro", "labels": ["CEO"]}]
        })
    );
}

#[tokio::test]
async fn test_search_without_upstream_is_lenient() {
    let app = spawn_app("http://127.0.0.1:1");

    let response = send_get(&app, "/search?q=heir", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"success": false, "data": []}));

    let response = send_get(&app, "/search", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"success": false, "data": []}));
}

#[tokio::test]
async fn test_filter_and_index() {
    let server = TestServer::new().await;
    let app = spawn_app(&server.base_url);

    let body = body_json(send_get(&app, "/filter?offset=2", None).await).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["maxOffset"], 7);
    assert_eq!(body["dramas"][0]["shortPlayId"], "42");

    let html = body_text(send_get(&app, "/", None).await).await;
    assert!(html.contains("href=\"/api/hidden-heir/42\""));
}

#[tokio::test]
async fn test_filter_without_upstream_is_lenient() {
    let app = spawn_app("http://127.0.0.1:1");

    let response = send_get(&app, "/filter", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_malformed_catalog_query_is_lenient() {
    let server = TestServer::new().await;
    let app = spawn_app(&server.base_url);

    let response = send_get(&app, "/search?q=a&q=b", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"success": false, "data": []}));

    let response = send_get(&app, "/filter?offset=1&offset=2", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());
}

// ============================================================================
// Stream proxy
// ============================================================================

#[tokio::test]
async fn test_download_requires_url() {
    let app = spawn_app("http://127.0.0.1:1");

    let response = send_get(&app, "/download/api", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send_get(&app, "/download/api/sub", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].is_string());
    assert!(body["details"].as_str().unwrap().contains("url"));
}

#[tokio::test]
async fn test_download_retries_then_relays() {
    let server = TestServer::new().await;
    let app = spawn_app(&server.base_url);

    let source = server.url("/media/flaky/2/clip.mp4?tok=abc");
    let response = send_get(&app, &format!("/download/api?url={}", encode(&source)), None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"regexd-com-clip.mp4\""
    );
    assert_eq!(body_text(response).await, "clip-bytes");
    assert_eq!(server.state.flaky_hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_download_fails_after_retry_bound() {
    let server = TestServer::new().await;
    let app = spawn_app(&server.base_url);

    let source = server.url("/media/flaky/3/clip.mp4");
    let response = send_get(&app, &format!("/download/api?url={}", encode(&source)), None).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(server.state.flaky_hits.load(Ordering::SeqCst), 3);
    assert!(!body_text(response).await.is_empty());
}

#[tokio::test]
async fn test_subtitle_download_headers() {
    let server = TestServer::new().await;
    let app = spawn_app(&server.base_url);

    let source = server.url("/subs/plain.vtt");
    let response = send_get(&app, &format!("/download/api/sub?url={}", encode(&source)), None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/vtt");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"subtitle.vtt\""
    );
    assert!(body_text(response).await.starts_with("WEBVTT"));
}

#[tokio::test]
async fn test_subtitle_download_upstream_failure_is_json_500() {
    let app = spawn_app("http://127.0.0.1:1");

    let response = send_get(
        &app,
        &format!("/download/api/sub?url={}", encode("http://127.0.0.1:1/x.vtt")),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert!(body["error"].is_string());
    assert!(body["details"].as_str().unwrap().contains("3 attempts"));
}

#[tokio::test]
async fn test_large_body_is_relayed_in_chunks() {
    let server = TestServer::new().await;
    let app = spawn_app(&server.base_url);

    let source = server.url("/media/big.bin");
    let response = send_get(&app, &format!("/download/api?url={}", encode(&source)), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut body = response.into_body();
    let mut total = 0usize;
    let mut frames = 0usize;
    let mut largest = 0usize;
    while let Some(frame) = body.frame().await {
        if let Ok(data) = frame.unwrap().into_data() {
            total += data.len();
            largest = largest.max(data.len());
            frames += 1;
        }
    }

    assert_eq!(total, BIG_CHUNK * BIG_CHUNKS);
    assert!(frames > 1);
    assert!(largest < total / 4);
}

#[tokio::test]
async fn test_truncated_upstream_body_aborts_relay() {
    let upstream = spawn_truncating_upstream().await;
    let app = spawn_app(&upstream);

    let source = format!("{upstream}/media/cut.mp4");
    let response = send_get(&app, &format!("/download/api?url={}", encode(&source)), None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "1000");
    assert!(response.into_body().collect().await.is_err());
}

#[tokio::test]
async fn test_client_disconnect_releases_upstream() {
    let server = TestServer::new().await;
    let app = spawn_app(&server.base_url);

    let source = server.url("/media/endless.mp4");
    let response = send_get(&app, &format!("/download/api?url={}", encode(&source)), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut body = response.into_body();
    let frame = body.frame().await.unwrap().unwrap();
    assert!(frame.into_data().is_ok());
    assert!(!server.state.endless_dropped.load(Ordering::SeqCst));
    drop(body);

    let released = tokio::time::timeout(Duration::from_secs(5), async {
        while !server.state.endless_dropped.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(released.is_ok(), "upstream body was not dropped after client disconnect");
}
