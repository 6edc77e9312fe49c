use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use super::common::{Query, QueryCommon};

const POSTS_DOCUMENT: &str = r#"query getPosts($first: Int, $after: String, $postedAfter: DateTime, $postedBefore: DateTime, $order: PostsOrder, $featured: Boolean) {
  posts(first: $first, after: $after, postedAfter: $postedAfter, postedBefore: $postedBefore, order: $order, featured: $featured) {
    totalCount
    pageInfo {
      endCursor
      hasNextPage
    }
    edges {
      node {
        id
        name
        tagline
        description
        url
        website
        votesCount
        commentsCount
        createdAt
        topics {
          edges {
            node {
              name
            }
          }
        }
        thumbnail {
          url
        }
        media {
          url
          type
          videoUrl
        }
        makers {
          id
          name
          username
        }
      }
    }
  }
}"#;

/// Ordering accepted by the `posts` connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PostsOrder {
    /// Leaderboard ranking.
    Ranking,
    /// Newest first. This is the API default.
    #[default]
    Newest,
    Votes,
    FeaturedAt,
}

impl fmt::Display for PostsOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PostsOrder::Ranking => "RANKING",
            PostsOrder::Newest => "NEWEST",
            PostsOrder::Votes => "VOTES",
            PostsOrder::FeaturedAt => "FEATURED_AT",
        };
        write!(f, "{}", s)
    }
}

/// Query builder for the `posts` connection.
#[derive(Clone, Debug, Default)]
pub struct PostsQuery {
    pub common: QueryCommon,
    pub posted_after: Option<DateTime<Utc>>,
    pub posted_before: Option<DateTime<Utc>>,
    pub order: Option<PostsOrder>,
    pub featured: Option<bool>,
}

impl Query for PostsQuery {
    fn document(&self) -> &'static str {
        POSTS_DOCUMENT
    }

    fn variables(&self) -> Map<String, Value> {
        let mut vars = Map::new();
        if let Some(after) = self.posted_after {
            vars.insert("postedAfter".to_string(), Value::from(rfc3339(after)));
        }
        if let Some(before) = self.posted_before {
            vars.insert("postedBefore".to_string(), Value::from(rfc3339(before)));
        }
        if let Some(order) = self.order {
            vars.insert("order".to_string(), Value::from(order.to_string()));
        }
        if let Some(featured) = self.featured {
            vars.insert("featured".to_string(), Value::from(featured));
        }
        vars
    }

    fn common(&self) -> &QueryCommon {
        &self.common
    }

    fn get_common(&mut self) -> &mut QueryCommon {
        &mut self.common
    }
}

impl PostsQuery {
    /// Restricts results to posts created in `[after, before)`.
    pub fn with_posted_between(mut self, after: DateTime<Utc>, before: DateTime<Utc>) -> Self {
        self.posted_after = Some(after);
        self.posted_before = Some(before);
        self
    }

    /// Restricts results to posts created at or after `after`.
    pub fn with_posted_after(mut self, after: DateTime<Utc>) -> Self {
        self.posted_after = Some(after);
        self
    }

    pub fn with_order(mut self, order: PostsOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_featured(mut self, featured: bool) -> Self {
        self.featured = Some(featured);
        self
    }
}

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
