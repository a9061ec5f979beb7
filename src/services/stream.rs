use std::fmt;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{HeaderValue, header};
use futures::StreamExt;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use super::attachment::{AttachmentHeaders, DownloadKind, attachment_headers};
use super::retry::RetryPolicy;
use crate::config::StreamConfig;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid source URL: {0}")]
    InvalidUrl(String),

    #[error("Upstream returned HTTP {0}")]
    Status(u16),

    #[error("No response from upstream within {0:?}")]
    AttemptTimeout(Duration),

    #[error("Upstream request failed: {0}")]
    Transport(String),

    #[error("Failed to fetch upstream media after {attempts} attempts: {last}")]
    FetchFailed { attempts: u32, last: String },
}

impl StreamError {
    /// Whether the caller sent an unusable request, as opposed to an upstream failure.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingParameter(_) | Self::InvalidUrl(_))
    }
}

/// One proxied exchange: where to fetch from and how to label the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub source: Url,
    pub kind: DownloadKind,
}

impl StreamRequest {
    /// Validates the raw `url` query parameter. No network access happens here.
    pub fn parse(raw: Option<&str>, kind: DownloadKind) -> Result<Self, StreamError> {
        let raw = raw
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(StreamError::MissingParameter("url"))?;

        let source = Url::parse(raw).map_err(|e| StreamError::InvalidUrl(format!("{raw}: {e}")))?;
        if !matches!(source.scheme(), "http" | "https") {
            return Err(StreamError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                source.scheme()
            )));
        }

        Ok(Self { source, kind })
    }
}

/// An upstream response whose headers arrived; the body has not been read yet.
#[derive(Debug)]
pub struct ProxiedStream {
    pub headers: AttachmentHeaders,
    pub content_length: Option<u64>,
    source: Url,
    response: reqwest::Response,
}

impl ProxiedStream {
    /// Relays upstream chunks in arrival order without buffering the body.
    ///
    /// Dropping the returned body (client gone) drops the upstream response
    /// and releases its connection. An upstream error mid-body ends the
    /// stream with an error, which aborts the client connection.
    pub fn into_body(self) -> Body {
        let upstream = Box::pin(self.response.bytes_stream());
        let relay = Relay::new(self.source);

        let stream = futures::stream::unfold((upstream, relay), |(mut upstream, mut relay)| async move {
            match upstream.next().await {
                Some(Ok(chunk)) => {
                    relay.chunk(chunk.len());
                    Some((Ok(chunk), (upstream, relay)))
                }
                Some(Err(e)) => {
                    relay.fail(&e);
                    Some((Err(e), (upstream, relay)))
                }
                None => {
                    relay.finish();
                    None
                }
            }
        });
        Body::from_stream(stream)
    }

    #[must_use]
    pub fn content_length_header(&self) -> Option<HeaderValue> {
        self.content_length.map(HeaderValue::from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelayState {
    Streaming,
    Completed,
    Failed,
}

impl RelayState {
    /// A relay dropped while still streaming was cancelled by the client.
    const fn outcome(self) -> &'static str {
        match self {
            Self::Streaming => "cancelled",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Tracks one body relay and records its outcome when dropped.
struct Relay {
    source: Url,
    started: Instant,
    bytes: u64,
    state: RelayState,
}

impl Relay {
    fn new(source: Url) -> Self {
        Self {
            source,
            started: Instant::now(),
            bytes: 0,
            state: RelayState::Streaming,
        }
    }

    fn chunk(&mut self, len: usize) {
        self.bytes += len as u64;
    }

    fn fail(&mut self, error: &impl fmt::Display) {
        warn!(
            url = %self.source,
            bytes = self.bytes,
            error = %error,
            "Upstream body failed after streaming began"
        );
        self.state = RelayState::Failed;
    }

    fn finish(&mut self) {
        if self.state == RelayState::Streaming {
            self.state = RelayState::Completed;
        }
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        let outcome = self.state.outcome();
        let elapsed = self.started.elapsed();

        metrics::counter!("stream_relays_total", "outcome" => outcome).increment(1);
        metrics::counter!("stream_bytes_total").increment(self.bytes);
        metrics::histogram!("stream_relay_duration_seconds", "outcome" => outcome)
            .record(elapsed.as_secs_f64());

        debug!(
            url = %self.source,
            outcome,
            bytes = self.bytes,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "Relay ended"
        );
    }
}

/// Opens upstream media URLs with bounded retry and a per-attempt deadline.
#[derive(Clone)]
pub struct StreamProxy {
    client: Client,
    retry: RetryPolicy,
    attempt_timeout: Duration,
}

impl StreamProxy {
    #[must_use]
    pub const fn new(client: Client, retry: RetryPolicy, attempt_timeout: Duration) -> Self {
        Self {
            client,
            retry,
            attempt_timeout,
        }
    }

    #[must_use]
    pub const fn from_config(client: Client, config: &StreamConfig) -> Self {
        Self::new(
            client,
            RetryPolicy::from_config(config),
            Duration::from_secs(config.attempt_timeout_seconds),
        )
    }

    /// Fetches `request.source` until the response headers arrive with a
    /// success status, retrying per the policy. Streaming itself is never
    /// retried.
    pub async fn open(&self, request: &StreamRequest) -> Result<ProxiedStream, StreamError> {
        let source = &request.source;
        let this = self;

        let response = self
            .retry
            .run(move |attempt| this.attempt(source, attempt))
            .await
            .map_err(|e| {
                metrics::counter!("stream_failures_total", "phase" => "fetching").increment(1);
                StreamError::FetchFailed {
                    attempts: self.retry.max_attempts(),
                    last: e.to_string(),
                }
            })?;

        let headers = attachment_headers(
            &request.kind,
            source,
            response.headers().get(header::CONTENT_TYPE),
        );
        let content_length = response.content_length();

        info!(
            url = %source,
            content_type = ?headers.content_type,
            content_length = ?content_length,
            "Streaming upstream media"
        );

        Ok(ProxiedStream {
            headers,
            content_length,
            source: source.clone(),
            response,
        })
    }

    async fn attempt(&self, source: &Url, attempt: u32) -> Result<reqwest::Response, StreamError> {
        debug!(url = %source, attempt, "Fetching upstream media");
        metrics::counter!("stream_attempts_total").increment(1);

        let response = tokio::time::timeout(self.attempt_timeout, self.client.get(source.clone()).send())
            .await
            .map_err(|_| StreamError::AttemptTimeout(self.attempt_timeout))?
            .map_err(|e| StreamError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Status(status.as_u16()));
        }

        Ok(response)
    }
}
