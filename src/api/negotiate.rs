//! `Accept` header negotiation between the JSON payload and the HTML player.

use axum::http::{HeaderMap, header};
use mime::Mime;

/// True when the client accepts JSON and does not accept HTML.
///
/// A missing `Accept` header accepts everything, which means HTML wins.
#[must_use]
pub fn prefers_json(headers: &HeaderMap) -> bool {
    let Some(accept) = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()) else {
        return false;
    };

    accepts(accept, &mime::APPLICATION_JSON) && !accepts(accept, &mime::TEXT_HTML)
}

/// Whether `target` is acceptable, decided by the most specific matching range.
fn accepts(accept: &str, target: &Mime) -> bool {
    accept
        .split(',')
        .filter_map(|range| range.trim().parse::<Mime>().ok())
        .filter_map(|range| specificity(&range, target).map(|s| (s, quality(&range))))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .is_some_and(|(_, q)| q > 0.0)
}

fn specificity(range: &Mime, target: &Mime) -> Option<u8> {
    if range.type_() == mime::STAR && range.subtype() == mime::STAR {
        Some(0)
    } else if range.type_() != target.type_() {
        None
    } else if range.subtype() == mime::STAR {
        Some(1)
    } else if range.subtype() == target.subtype() {
        Some(2)
    } else {
        None
    }
}

fn quality(range: &Mime) -> f32 {
    range
        .get_param("q")
        .and_then(|q| q.as_str().parse::<f32>().ok())
        .unwrap_or(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_accept(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_json_only_client() {
        assert!(prefers_json(&with_accept("application/json")));
        assert!(prefers_json(&with_accept("application/*")));
        assert!(prefers_json(&with_accept("application/json, text/plain")));
    }

    #[test]
    fn test_browser_gets_html() {
        assert!(!prefers_json(&with_accept(
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
        )));
        assert!(!prefers_json(&with_accept("*/*")));
        assert!(!prefers_json(&with_accept("application/json, text/html")));
    }

    #[test]
    fn test_missing_or_empty_accept() {
        assert!(!prefers_json(&HeaderMap::new()));
        assert!(!prefers_json(&with_accept("")));
    }

    #[test]
    fn test_quality_zero_excludes() {
        assert!(prefers_json(&with_accept("text/html;q=0, */*")));
        assert!(!prefers_json(&with_accept("application/json;q=0, text/plain")));
    }
}
