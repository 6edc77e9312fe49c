use serde::{Deserialize, Serialize};

use super::Connection;

/// One launch as returned by the `posts` connection.
///
/// Every field except `id` is optional: the API omits or nulls fields it
/// cannot resolve for the caller's token scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(default)]
    pub id: String,
    pub name: Option<String>,
    pub tagline: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub website: Option<String>,
    pub votes_count: Option<i64>,
    pub comments_count: Option<i64>,
    pub created_at: Option<String>,
    pub topics: Option<Connection<Topic>>,
    pub thumbnail: Option<Thumbnail>,
    pub media: Option<Vec<Media>>,
    pub makers: Option<Vec<Maker>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Topic {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Maker {
    #[serde(default)]
    pub id: String,
    pub name: Option<String>,
    pub username: Option<String>,
}
