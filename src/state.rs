use std::sync::Arc;
use std::time::Duration;

use crate::clients::upstream::UpstreamClient;
use crate::config::Config;
use crate::services::{EpisodeResolver, StreamProxy};

/// Client for JSON lookups: one total deadline per request.
fn build_lookup_http_client(config: &Config) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.upstream.request_timeout_seconds))
        .user_agent(&config.upstream.user_agent)
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build lookup HTTP client: {e}"))
}

/// Client for media relays. No total timeout, since bodies may be arbitrarily
/// large; the connection phase and gaps between chunks are bounded instead.
fn build_stream_http_client(config: &Config) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.stream.attempt_timeout_seconds))
        .read_timeout(Duration::from_secs(config.stream.read_timeout_seconds))
        .user_agent(&config.upstream.user_agent)
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build stream HTTP client: {e}"))
}

/// Everything a request handler needs. Immutable after startup; the only
/// state shared between requests is the HTTP connection pools.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub upstream: UpstreamClient,

    pub resolver: EpisodeResolver,

    pub proxy: StreamProxy,
}

impl SharedState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let lookup_client = build_lookup_http_client(&config)?;
        let stream_client = build_stream_http_client(&config)?;

        let upstream = UpstreamClient::new(lookup_client, &config.upstream.base_url)?;
        let resolver = EpisodeResolver::new(upstream.clone(), config.upstream.quality.clone());
        let proxy = StreamProxy::from_config(stream_client, &config.stream);

        Ok(Self {
            config: Arc::new(config),
            upstream,
            resolver,
            proxy,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}
