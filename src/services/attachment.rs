//! Outbound headers for proxied downloads.

use axum::http::HeaderValue;
use url::Url;

pub const SUBTITLE_FILENAME: &str = "subtitle.vtt";
const FALLBACK_SEGMENT: &str = "download";

/// Which download route a proxied stream was requested through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadKind {
    Subtitle,
    Media { prefix: String },
}

impl DownloadKind {
    #[must_use]
    pub const fn fallback_content_type(&self) -> &'static str {
        match self {
            Self::Subtitle => "text/vtt",
            Self::Media { .. } => "application/octet-stream",
        }
    }

    #[must_use]
    pub fn filename(&self, source: &Url) -> String {
        match self {
            Self::Subtitle => SUBTITLE_FILENAME.to_string(),
            Self::Media { prefix } => format!("{prefix}{}", last_path_segment(source)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentHeaders {
    pub content_type: HeaderValue,
    pub content_disposition: HeaderValue,
}

/// Maps the upstream `Content-Type` (if any) and source URL to the headers
/// sent back to the client.
#[must_use]
pub fn attachment_headers(
    kind: &DownloadKind,
    source: &Url,
    upstream_content_type: Option<&HeaderValue>,
) -> AttachmentHeaders {
    let content_type = upstream_content_type
        .filter(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(kind.fallback_content_type()));

    let filename = sanitize_filename(&kind.filename(source));
    let content_disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    AttachmentHeaders {
        content_type,
        content_disposition,
    }
}

/// Last path segment of `source`, never including the query string.
#[must_use]
pub fn last_path_segment(source: &Url) -> &str {
    source
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .unwrap_or(FALLBACK_SEGMENT)
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() || !c.is_ascii() => '_',
            c => c,
        })
        .collect()
}
