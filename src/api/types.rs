use serde::Serialize;
use serde_json::Value;

use crate::clients::upstream::{FilterPage, SearchItem};
use crate::services::Resolution;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// `/search` always carries a `data` array, empty on failure.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub data: Vec<SearchItem>,
}

impl SearchResponse {
    #[must_use]
    pub const fn failed() -> Self {
        Self {
            success: false,
            data: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum FilterResponse {
    Page {
        success: bool,
        #[serde(flatten)]
        page: FilterPage,
    },
    Failed {
        success: bool,
        message: String,
    },
}

impl FilterResponse {
    #[must_use]
    pub const fn page(page: FilterPage) -> Self {
        Self::Page {
            success: true,
            page,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            success: false,
            message: message.into(),
        }
    }
}

/// Resolved episode for programmatic callers. Absent values serialize as `null`.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EpisodePayload {
    pub short_play_name: String,
    pub short_play_cover: String,
    pub short_play_labels: Vec<String>,
    pub shot_introduce: String,
    pub episode_no: Option<Value>,
    pub play_voucher: Option<String>,
    pub subtitle_url: Option<String>,
    pub like_nums: Option<Value>,
    pub chase_nums: Option<Value>,
    pub play_clarity: Option<String>,
}

impl From<&Resolution> for EpisodePayload {
    fn from(resolution: &Resolution) -> Self {
        Self {
            short_play_name: resolution.title.name.clone(),
            short_play_cover: resolution.title.cover.clone(),
            short_play_labels: resolution.title.labels.clone(),
            shot_introduce: resolution.title.description.clone(),
            episode_no: resolution.episode_number().cloned(),
            play_voucher: resolution.asset_token().map(str::to_string),
            subtitle_url: resolution.subtitle_url().map(str::to_string),
            like_nums: resolution.like_count().cloned(),
            chase_nums: resolution.chase_count().cloned(),
            play_clarity: resolution.quality().map(str::to_string),
        }
    }
}
