//! Title lookup and episode selection.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::clients::upstream::{UpstreamClient, UpstreamError};
use crate::models::drama::{EpisodeRecord, TitleRecord, episodes_from_payload};
use crate::models::fields::canonical_episode_text;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Title {0} not found or rejected by upstream")]
    TitleNotFound(String),

    #[error(transparent)]
    Upstream(UpstreamError),
}

/// A title with its episodes and the one episode chosen for this request.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub title: TitleRecord,
    pub episodes: Vec<EpisodeRecord>,
    selected: Option<usize>,
}

impl Resolution {
    /// Builds a resolution from the `data` object of a title payload.
    #[must_use]
    pub fn from_payload(title_id: &str, data: &Value, requested: Option<&str>) -> Self {
        let info = data.get("dramaInfo").unwrap_or(&Value::Null);
        let title = TitleRecord::from_value(title_id, info);
        let episodes = episodes_from_payload(data);
        let selected = select_episode(&episodes, requested);

        Self {
            title,
            episodes,
            selected,
        }
    }

    #[must_use]
    pub fn selected(&self) -> Option<&EpisodeRecord> {
        self.selected.and_then(|i| self.episodes.get(i))
    }

    #[must_use]
    pub const fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    #[must_use]
    pub fn asset_token(&self) -> Option<&str> {
        self.selected()?.asset_token.as_deref()
    }

    #[must_use]
    pub fn subtitle_url(&self) -> Option<&str> {
        self.selected()?.primary_subtitle_url()
    }

    #[must_use]
    pub fn like_count(&self) -> Option<&Value> {
        self.selected()?.like_count.as_ref()
    }

    #[must_use]
    pub fn chase_count(&self) -> Option<&Value> {
        self.selected()?.chase_count.as_ref()
    }

    #[must_use]
    pub fn quality(&self) -> Option<&str> {
        self.selected()?.quality.as_deref()
    }

    #[must_use]
    pub fn episode_number(&self) -> Option<&Value> {
        self.selected()?.number.as_ref()
    }
}

/// Index of the episode matching `requested` by canonical number, else the
/// first episode, else `None` for an empty list.
#[must_use]
pub fn select_episode(episodes: &[EpisodeRecord], requested: Option<&str>) -> Option<usize> {
    let wanted = requested.and_then(canonical_episode_text);

    wanted
        .and_then(|wanted| {
            episodes
                .iter()
                .position(|ep| ep.canonical_number.as_deref() == Some(wanted.as_str()))
        })
        .or_else(|| (!episodes.is_empty()).then_some(0))
}

#[derive(Clone)]
pub struct EpisodeResolver {
    upstream: UpstreamClient,
    quality: String,
}

impl EpisodeResolver {
    #[must_use]
    pub fn new(upstream: UpstreamClient, quality: impl Into<String>) -> Self {
        Self {
            upstream,
            quality: quality.into(),
        }
    }

    /// Fetches `title_id` once (no retry) and selects an episode.
    pub async fn resolve(
        &self,
        title_id: &str,
        episode_no: Option<&str>,
    ) -> Result<Resolution, ResolveError> {
        debug!(title_id, episode_no, "Resolving episode");

        let body = self
            .upstream
            .title(title_id, &self.quality)
            .await
            .map_err(|e| match e {
                UpstreamError::Unsuccessful(_) => ResolveError::TitleNotFound(title_id.to_string()),
                other => ResolveError::Upstream(other),
            })?;

        let data = body
            .get("data")
            .filter(|d| d.is_object())
            .ok_or_else(|| ResolveError::TitleNotFound(title_id.to_string()))?;

        let resolution = Resolution::from_payload(title_id, data, episode_no);

        info!(
            title_id,
            requested = episode_no,
            episodes = resolution.episodes.len(),
            selected = ?resolution.episode_number(),
            "Episode resolved"
        );

        Ok(resolution)
    }
}
