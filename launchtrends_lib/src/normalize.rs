//! Record Normalizer: raw API post to canonical record.

use chrono::{DateTime, Utc};
use producthunt_api::types::{Media, Post};

use crate::record::{LaunchRecord, LIST_SEPARATOR};
use crate::window::Timezone;

/// Maps one raw post to one record. Never fails: absent fields become
/// empty strings or zero counts.
pub fn normalize(post: &Post, timezone: Timezone) -> LaunchRecord {
    let topics: Vec<&str> = post
        .topics
        .as_ref()
        .map(|c| {
            c.edges
                .iter()
                .map(|e| e.node.name.trim())
                .filter(|n| !n.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let media = post.media.as_deref().unwrap_or_default();
    let gallery: Vec<&str> = media
        .iter()
        .filter(|m| is_type(m, "image"))
        .filter_map(|m| non_empty(m.url.as_deref()))
        .collect();
    let demo_video = media
        .iter()
        .filter(|m| is_type(m, "video"))
        .find_map(|m| non_empty(m.video_url.as_deref()).or_else(|| non_empty(m.url.as_deref())))
        .unwrap_or_default();

    let makers: Vec<&str> = post
        .makers
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|m| non_empty(m.username.as_deref()))
        .collect();

    LaunchRecord {
        name: text(&post.name),
        tagline: text(&post.tagline),
        description: text(&post.description),
        product_url: text(&post.url),
        website_url: text(&post.website),
        upvotes: post.votes_count.unwrap_or(0),
        comments: post.comments_count.unwrap_or(0),
        launch_date: launch_date(post.created_at.as_deref(), timezone),
        topics: topics.join(LIST_SEPARATOR),
        thumbnail_url: post
            .thumbnail
            .as_ref()
            .and_then(|t| non_empty(t.url.as_deref()))
            .unwrap_or_default()
            .to_string(),
        gallery_urls: gallery.join(LIST_SEPARATOR),
        demo_video_url: demo_video.to_string(),
        makers: makers.join(LIST_SEPARATOR),
    }
}

/// Calendar date of `created_at` in `timezone`, formatted `YYYY-MM-DD`.
///
/// Unparseable timestamps keep their first ten characters.
pub fn launch_date(created_at: Option<&str>, timezone: Timezone) -> String {
    let Some(raw) = created_at.map(str::trim).filter(|s| !s.is_empty()) else {
        return String::new();
    };
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => timezone
            .date_of(ts.with_timezone(&Utc))
            .format("%Y-%m-%d")
            .to_string(),
        Err(_) => raw.get(..10).unwrap_or(raw).to_string(),
    }
}

fn is_type(media: &Media, kind: &str) -> bool {
    media
        .media_type
        .as_deref()
        .is_some_and(|t| t.eq_ignore_ascii_case(kind))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn text(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}
