use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::models::fields::{first_present, first_string};

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Upstream request timed out: {0}")]
    Timeout(String),

    #[error("Upstream returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Upstream request failed: {0}")]
    Transport(String),

    #[error("Upstream returned an invalid body: {0}")]
    InvalidBody(String),

    #[error("Upstream reported failure for {0}")]
    Unsuccessful(String),

    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(String),
}

impl UpstreamError {
    fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::InvalidBody(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Catalog search hit, projected from the upstream search payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchItem {
    pub id: String,
    pub name: String,
    pub cover: String,
    pub intro: String,
    pub labels: Vec<String>,
}

impl SearchItem {
    fn from_value(value: &Value) -> Self {
        let labels = first_present(value, &["labelNames"])
            .and_then(Value::as_array)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|l| l.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: first_string(value, &["shortPlayId"]).unwrap_or_default(),
            name: first_string(value, &["shortPlayName"]).unwrap_or_default(),
            cover: first_string(value, &["shortPlayCover"]).unwrap_or_default(),
            intro: first_string(value, &["shotIntroduce", "shortIntroduce"]).unwrap_or_default(),
            labels,
        }
    }
}

/// Query for the catalog filter endpoint. Every field has an upstream default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterQuery {
    pub tag_id: String,
    pub order_mode: String,
    pub region_key: String,
    pub audio_key: String,
    pub offset: String,
}

impl Default for FilterQuery {
    fn default() -> Self {
        Self {
            tag_id: "Semua".to_string(),
            order_mode: "1".to_string(),
            region_key: "0".to_string(),
            audio_key: "0".to_string(),
            offset: "1".to_string(),
        }
    }
}

impl FilterQuery {
    /// Replaces blank values with the defaults, so `?tagId=` behaves like a missing key.
    #[must_use]
    pub fn with_defaults(self) -> Self {
        let defaults = Self::default();
        let pick = |value: String, default: String| {
            if value.trim().is_empty() { default } else { value }
        };

        Self {
            tag_id: pick(self.tag_id, defaults.tag_id),
            order_mode: pick(self.order_mode, defaults.order_mode),
            region_key: pick(self.region_key, defaults.region_key),
            audio_key: pick(self.audio_key, defaults.audio_key),
            offset: pick(self.offset, defaults.offset),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterPage {
    pub dramas: Vec<Value>,
    pub max_offset: Value,
}

/// JSON client for the drama catalog API.
///
/// Every call is a single attempt bounded by the client's timeout.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    base_url: Url,
}

impl UpstreamClient {
    pub fn new(client: Client, base_url: &str) -> Result<Self, UpstreamError> {
        let base_url =
            Url::parse(base_url).map_err(|e| UpstreamError::InvalidUrl(format!("{base_url}: {e}")))?;
        Ok(Self { client, base_url })
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, UpstreamError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| UpstreamError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn fetch_json(&self, url: Url) -> Result<Value, UpstreamError> {
        debug!(url = %url, "Fetching upstream JSON");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::from_reqwest(&e))?;
        let value: Value =
            serde_json::from_slice(&body).map_err(|e| UpstreamError::InvalidBody(e.to_string()))?;

        if value.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(UpstreamError::Unsuccessful(url.to_string()));
        }

        Ok(value)
    }

    /// Full payload for one title, including its episode list.
    pub async fn title(&self, id: &str, quality: &str) -> Result<Value, UpstreamError> {
        let mut url = self.endpoint(&["api", "drama", id])?;
        url.query_pairs_mut().append_pair("quality", quality);
        self.fetch_json(url).await
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchItem>, UpstreamError> {
        let mut url = self.endpoint(&["api", "drama", "search", "query"])?;
        url.query_pairs_mut().append_pair("searchCode", query);

        let body = self.fetch_json(url).await?;
        let items = body
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| UpstreamError::InvalidBody("search payload has no data list".into()))?;

        Ok(items.iter().map(SearchItem::from_value).collect())
    }

    fn filter_url(&self, query: &FilterQuery) -> Result<Url, UpstreamError> {
        let query = query.clone().with_defaults();
        let mut url = self.endpoint(&["api", "drama", "filter", "query"])?;
        url.query_pairs_mut()
            .append_pair("tagId", &query.tag_id)
            .append_pair("orderMode", &query.order_mode)
            .append_pair("regionKey", &query.region_key)
            .append_pair("audioKey", &query.audio_key)
            .append_pair("offset", &query.offset);
        Ok(url)
    }

    pub async fn filter(&self, query: &FilterQuery) -> Result<FilterPage, UpstreamError> {
        let url = self.filter_url(query)?;
        let body = self.fetch_json(url).await?;
        let data = body.get("data").unwrap_or(&Value::Null);

        let dramas = data
            .get("dataList")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let max_offset = first_present(data, &["maxOffset"])
            .filter(|v| v.as_i64() != Some(0))
            .cloned()
            .unwrap_or_else(|| Value::from(1));

        Ok(FilterPage { dramas, max_offset })
    }

    /// Filter dimensions (tags, regions, audio) shown on the catalog page.
    pub async fn filter_constants(&self) -> Result<Value, UpstreamError> {
        let url = self.endpoint(&["api", "drama", "classes", "constant"])?;
        let body = self.fetch_json(url).await?;

        Ok(body
            .get("data")
            .and_then(|data| data.get("data"))
            .cloned()
            .unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(base: &str) -> UpstreamClient {
        UpstreamClient::new(Client::new(), base).unwrap()
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let upstream = client("https://api.example.com");
        let url = upstream.endpoint(&["api", "drama", "123"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/api/drama/123");

        let upstream = client("https://api.example.com/v1/");
        let url = upstream.endpoint(&["api", "drama", "a/b"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/api/drama/a%2Fb");
    }

    #[test]
    fn test_filter_blank_values_use_defaults() {
        let upstream = client("https://api.example.com");
        let query = FilterQuery {
            tag_id: String::new(),
            offset: " ".to_string(),
            region_key: "5".to_string(),
            ..FilterQuery::default()
        };
        let url = upstream.filter_url(&query).unwrap();
        assert_eq!(
            url.query(),
            Some("tagId=Semua&orderMode=1&regionKey=5&audioKey=0&offset=1")
        );

        let parsed: FilterQuery = serde_json::from_value(json!({"tagId": "", "orderMode": "2"})).unwrap();
        let parsed = parsed.with_defaults();
        assert_eq!(parsed.tag_id, "Semua");
        assert_eq!(parsed.order_mode, "2");
    }

    #[test]
    fn test_search_item_projection() {
        let item = SearchItem::from_value(&json!({
            "shortPlayId": 99,
            "shortPlayName": "Name",
            "shortPlayCover": "c",
            "shotIntroduce": "intro",
            "labelNames": ["a", "b"]
        }));
        assert_eq!(item.id, "99");
        assert_eq!(item.intro, "intro");
        assert_eq!(item.labels, vec!["a", "b"]);
    }

    #[test]
    fn test_filter_query_defaults() {
        let query: FilterQuery = serde_json::from_value(json!({"offset": "3"})).unwrap();
        assert_eq!(query.tag_id, "Semua");
        assert_eq!(query.order_mode, "1");
        assert_eq!(query.offset, "3");
    }
}
