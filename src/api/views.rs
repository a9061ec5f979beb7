//! Server-rendered pages: the catalog front page and the episode player.

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use serde_json::Value;
use std::fmt::Write;
use url::form_urlencoded::byte_serialize;

use crate::clients::upstream::FilterPage;
use crate::models::fields::{canonical_episode_number, first_string};
use crate::services::Resolution;

/// Everything the player page shows for one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerView {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub cover: String,
    pub labels: Vec<String>,
    pub description: String,
    pub episodes: Vec<EpisodeLink>,
    pub selected_episode: Option<String>,
    pub play_voucher: Option<String>,
    pub subtitle_url: Option<String>,
    pub like_nums: Option<String>,
    pub chase_nums: Option<String>,
    pub play_clarity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeLink {
    pub number: String,
    pub selected: bool,
}

fn display(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl PlayerView {
    #[must_use]
    pub fn new(id: &str, slug: &str, resolution: &Resolution) -> Self {
        let selected_index = resolution.selected_index();
        let episodes = resolution
            .episodes
            .iter()
            .enumerate()
            .filter_map(|(i, ep)| {
                ep.canonical_number.clone().map(|number| EpisodeLink {
                    number,
                    selected: Some(i) == selected_index,
                })
            })
            .collect();

        Self {
            id: id.to_string(),
            slug: slug.to_string(),
            name: resolution.title.name.clone(),
            cover: resolution.title.cover.clone(),
            labels: resolution.title.labels.clone(),
            description: resolution.title.description.clone(),
            episodes,
            selected_episode: resolution
                .episode_number()
                .and_then(canonical_episode_number),
            play_voucher: resolution.asset_token().map(str::to_string),
            subtitle_url: resolution.subtitle_url().map(str::to_string),
            like_nums: display(resolution.like_count()),
            chase_nums: display(resolution.chase_count()),
            play_clarity: resolution.quality().map(str::to_string),
        }
    }
}

/// URL-safe slug used in episode links, e.g. `"Hidden Heir!"` → `"hidden-heir"`.
#[must_use]
pub fn slugify(name: &str) -> String {
    let slug = name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        "drama".to_string()
    } else {
        slug
    }
}

fn encode_query(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n<link rel=\"stylesheet\" href=\"/style.css\">\n</head>\n\
         <body>\n{body}</body>\n</html>\n",
        text(title)
    )
}

#[must_use]
pub fn render_player(view: &PlayerView) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "<main class=\"player\">");
    let _ = writeln!(body, "<h1>{}</h1>", text(&view.name));

    match &view.play_voucher {
        Some(voucher) => {
            let _ = writeln!(
                body,
                "<video controls autoplay playsinline poster=\"{}\" src=\"{}\">",
                attr(&view.cover),
                attr(voucher)
            );
            if let Some(subtitle) = &view.subtitle_url {
                let _ = writeln!(
                    body,
                    "<track kind=\"subtitles\" default src=\"/download/api/sub?url={}\">",
                    attr(&encode_query(subtitle))
                );
            }
            let _ = writeln!(body, "</video>");
            let _ = writeln!(
                body,
                "<p><a class=\"download\" href=\"/download/api?url={}\">Download episode</a></p>",
                attr(&encode_query(voucher))
            );
        }
        None => {
            let _ = writeln!(body, "<p class=\"empty\">No playable episode available.</p>");
        }
    }

    let stats = [
        ("Episode", view.selected_episode.as_deref()),
        ("Likes", view.like_nums.as_deref()),
        ("Followers", view.chase_nums.as_deref()),
        ("Quality", view.play_clarity.as_deref()),
    ];
    let _ = writeln!(body, "<ul class=\"stats\">");
    for (label, value) in stats {
        if let Some(value) = value {
            let _ = writeln!(body, "<li>{label}: {}</li>", text(value));
        }
    }
    let _ = writeln!(body, "</ul>");

    if !view.labels.is_empty() {
        let _ = writeln!(body, "<ul class=\"labels\">");
        for label in &view.labels {
            let _ = writeln!(body, "<li>{}</li>", text(label));
        }
        let _ = writeln!(body, "</ul>");
    }
    let _ = writeln!(body, "<p class=\"intro\">{}</p>", text(&view.description));

    let _ = writeln!(body, "<nav class=\"episodes\">");
    for ep in &view.episodes {
        let class = if ep.selected { " class=\"active\"" } else { "" };
        let _ = writeln!(
            body,
            "<a{class} href=\"/api/{}/{}/{}\">{}</a>",
            attr(&view.slug),
            attr(&view.id),
            attr(&ep.number),
            text(&ep.number)
        );
    }
    let _ = writeln!(body, "</nav>\n</main>");

    page(&view.name, &body)
}

#[must_use]
pub fn render_catalog(constants: &Value, page_data: &FilterPage) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "<main class=\"catalog\">");
    let _ = writeln!(
        body,
        "<form action=\"/search\" method=\"get\"><input name=\"q\" placeholder=\"Search\"></form>"
    );
    let _ = writeln!(
        body,
        "<div id=\"filter-constants\" data-constants=\"{}\"></div>",
        attr(&constants.to_string())
    );

    let _ = writeln!(body, "<section class=\"dramas\">");
    for drama in &page_data.dramas {
        let id = first_string(drama, &["shortPlayId", "id"]).unwrap_or_default();
        let name = first_string(drama, &["shortPlayName", "name"]).unwrap_or_default();
        let cover = first_string(drama, &["shortPlayCover", "cover"]).unwrap_or_default();
        let _ = writeln!(
            body,
            "<a class=\"drama\" href=\"/api/{}/{}\"><img loading=\"lazy\" src=\"{}\" alt=\"\"><span>{}</span></a>",
            attr(&slugify(&name)),
            attr(&id),
            attr(&cover),
            text(&name)
        );
    }
    let _ = writeln!(body, "</section>");
    let _ = writeln!(
        body,
        "<p class=\"pages\" data-max-offset=\"{}\"></p>\n</main>",
        attr(&page_data.max_offset.to_string())
    );

    page("Catalog", &body)
}
