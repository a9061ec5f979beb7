use serde_json::Value;

use super::fields::{
    canonical_episode_number, first_non_empty_array, first_present, first_string,
};

const EPISODE_LIST_KEYS: &[&str] = &["result", "shortPlayEpisodeInfos"];
const DESCRIPTION_KEYS: &[&str] = &["shotIntroduce", "shortIntroduce"];
const ASSET_TOKEN_KEYS: &[&str] = &["playVoucher", "videoUrl"];
const SUBTITLE_LABEL_KEYS: &[&str] = &["subtitleLanguage", "language", "lang", "label"];

/// Catalog entry metadata, as found under `dramaInfo` in a title payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleRecord {
    pub id: String,
    pub name: String,
    pub cover: String,
    pub labels: Vec<String>,
    pub description: String,
}

impl TitleRecord {
    /// Builds the record from the `dramaInfo` object. Missing fields become empty.
    #[must_use]
    pub fn from_value(id: &str, info: &Value) -> Self {
        let labels = info
            .get("shortPlayLabels")
            .and_then(Value::as_array)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|label| match label {
                        Value::String(s) => Some(s.clone()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: id.to_string(),
            name: first_string(info, &["shortPlayName"]).unwrap_or_default(),
            cover: first_string(info, &["shortPlayCover"]).unwrap_or_default(),
            labels,
            description: first_string(info, DESCRIPTION_KEYS).unwrap_or_default(),
        }
    }
}

/// One `subtitleList` entry. Entries keep their upstream position even without a `url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleDescriptor {
    pub label: Option<String>,
    pub url: Option<String>,
}

impl SubtitleDescriptor {
    fn from_value(value: &Value) -> Self {
        Self {
            label: first_string(value, SUBTITLE_LABEL_KEYS),
            url: first_string(value, &["url"]),
        }
    }
}

/// One playable episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeRecord {
    pub number: Option<Value>,
    pub canonical_number: Option<String>,
    pub asset_token: Option<String>,
    pub subtitles: Vec<SubtitleDescriptor>,
    pub legacy_subtitle: Option<String>,
    pub like_count: Option<Value>,
    pub chase_count: Option<Value>,
    pub quality: Option<String>,
}

impl EpisodeRecord {
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let number = value.get("episodeNo").filter(|v| !v.is_null()).cloned();
        let canonical_number = number.as_ref().and_then(canonical_episode_number);

        let subtitles = value
            .get("subtitleList")
            .and_then(Value::as_array)
            .map(|list| list.iter().map(SubtitleDescriptor::from_value).collect())
            .unwrap_or_default();

        Self {
            number,
            canonical_number,
            asset_token: first_string(value, ASSET_TOKEN_KEYS),
            subtitles,
            legacy_subtitle: first_string(value, &["subtitle"]),
            like_count: first_present(value, &["likeNums"]).cloned(),
            chase_count: first_present(value, &["chaseNums"]).cloned(),
            quality: first_string(value, &["playClarity"]),
        }
    }

    /// The first subtitle entry's URL. The legacy single-subtitle field is
    /// only consulted when the list is empty.
    #[must_use]
    pub fn primary_subtitle_url(&self) -> Option<&str> {
        match self.subtitles.first() {
            Some(first) => first.url.as_deref(),
            None => self.legacy_subtitle.as_deref(),
        }
    }
}

/// Extracts the ordered episode list from a title payload.
#[must_use]
pub fn episodes_from_payload(payload: &Value) -> Vec<EpisodeRecord> {
    first_non_empty_array(payload, EPISODE_LIST_KEYS)
        .map(|items| items.iter().map(EpisodeRecord::from_value).collect())
        .unwrap_or_default()
}
