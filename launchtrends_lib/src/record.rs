//! Canonical flat record stored in the collection table.

use serde::{Deserialize, Deserializer, Serialize};

/// Column order of the collection table.
pub const COLUMNS: [&str; 13] = [
    "Product Name",
    "Tagline",
    "Description",
    "Product URL",
    "Website URL",
    "Upvotes",
    "Comments Count",
    "Launch Date",
    "Topics",
    "Thumbnail URL",
    "Gallery URLs",
    "Demo Video URL",
    "Makers",
];

/// Separator used for list-valued columns.
pub const LIST_SEPARATOR: &str = ", ";

/// One launch, flattened. List fields hold `", "`-joined values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchRecord {
    #[serde(rename = "Product Name")]
    pub name: String,
    #[serde(rename = "Tagline")]
    pub tagline: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Product URL")]
    pub product_url: String,
    #[serde(rename = "Website URL")]
    pub website_url: String,
    #[serde(rename = "Upvotes", deserialize_with = "lenient_count")]
    pub upvotes: i64,
    #[serde(rename = "Comments Count", deserialize_with = "lenient_count")]
    pub comments: i64,
    #[serde(rename = "Launch Date")]
    pub launch_date: String,
    #[serde(rename = "Topics")]
    pub topics: String,
    #[serde(rename = "Thumbnail URL", alias = "Thumbnail Image URL")]
    pub thumbnail_url: String,
    #[serde(rename = "Gallery URLs", alias = "Gallery Image URLs")]
    pub gallery_urls: String,
    #[serde(rename = "Demo Video URL")]
    pub demo_video_url: String,
    #[serde(rename = "Makers")]
    pub makers: String,
}

/// Identity of a record: product URL (or name when the URL is empty) plus launch date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    pub product: String,
    pub launch_date: String,
}

impl LaunchRecord {
    pub fn identity_key(&self) -> IdentityKey {
        let url = self.product_url.trim();
        let product = if url.is_empty() {
            self.name.trim()
        } else {
            url
        };
        IdentityKey {
            product: product.to_string(),
            launch_date: self.launch_date.trim().to_string(),
        }
    }

    /// Topic names, split back out of the joined column.
    pub fn topic_list(&self) -> Vec<&str> {
        split_list(&self.topics)
    }

    /// Cells in [`COLUMNS`] order.
    pub fn to_row(&self) -> [String; 13] {
        [
            self.name.clone(),
            self.tagline.clone(),
            self.description.clone(),
            self.product_url.clone(),
            self.website_url.clone(),
            self.upvotes.to_string(),
            self.comments.to_string(),
            self.launch_date.clone(),
            self.topics.clone(),
            self.thumbnail_url.clone(),
            self.gallery_urls.clone(),
            self.demo_video_url.clone(),
            self.makers.clone(),
        ]
    }
}

/// Inverse of joining with [`LIST_SEPARATOR`].
pub fn split_list(joined: &str) -> Vec<&str> {
    joined
        .split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Accepts integers, floats ("12.0") and blanks in count columns.
fn lenient_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    let raw = raw.trim();
    Ok(raw
        .parse::<i64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().map(|f| f as i64))
        .unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_prefers_url() {
        let record = LaunchRecord {
            name: "Lumen".into(),
            product_url: "https://ph/lumen".into(),
            launch_date: "2024-01-01".into(),
            ..LaunchRecord::default()
        };
        let key = record.identity_key();
        assert_eq!(key.product, "https://ph/lumen");
        assert_eq!(key.launch_date, "2024-01-01");
    }

    #[test]
    fn identity_falls_back_to_name() {
        let record = LaunchRecord {
            name: "Lumen".into(),
            launch_date: "2024-01-01".into(),
            ..LaunchRecord::default()
        };
        assert_eq!(record.identity_key().product, "Lumen");
    }

    #[test]
    fn topic_list_splits_joined_column() {
        let record = LaunchRecord {
            topics: "Productivity, Artificial Intelligence, ".into(),
            ..LaunchRecord::default()
        };
        assert_eq!(
            record.topic_list(),
            vec!["Productivity", "Artificial Intelligence"]
        );
    }

    #[test]
    fn topic_with_inner_comma_stays_whole() {
        let topics = ["Design Tools", "Tools, Utilities", "SaaS"];
        let record = LaunchRecord {
            topics: topics.join(LIST_SEPARATOR),
            ..LaunchRecord::default()
        };
        assert_eq!(record.topic_list(), topics.to_vec());
    }

    #[test]
    fn row_matches_column_count() {
        assert_eq!(LaunchRecord::default().to_row().len(), COLUMNS.len());
    }

    #[test]
    fn lenient_counts_from_csv() {
        let data = "Product Name,Upvotes,Comments Count\nA,12.0,\nB,7,3\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let records: Vec<LaunchRecord> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(records[0].upvotes, 12);
        assert_eq!(records[0].comments, 0);
        assert_eq!(records[1].upvotes, 7);
        assert_eq!(records[1].comments, 3);
    }

    #[test]
    fn legacy_column_aliases_accepted() {
        let data = "Product Name,Thumbnail Image URL,Gallery Image URLs\nA,https://t,https://g1\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let record: LaunchRecord = reader.deserialize().next().unwrap().unwrap();
        assert_eq!(record.thumbnail_url, "https://t");
        assert_eq!(record.gallery_urls, "https://g1");
    }
}
