//! Article payload produced by the generator and consumed by the renderer.

use serde::{Deserialize, Deserializer, Serialize};

/// Models emit `null` for fields they have nothing for; treat it like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticlePayload {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub subtitle: String,
    #[serde(deserialize_with = "null_as_default")]
    pub slug: String,
    #[serde(deserialize_with = "null_as_default")]
    pub keywords: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sections: Vec<Section>,
    #[serde(deserialize_with = "null_as_default")]
    pub image_queries: Vec<ImageQuery>,
    #[serde(deserialize_with = "null_as_default")]
    pub sources: Vec<Source>,
}

/// One `##` block of the article body.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Section {
    #[serde(deserialize_with = "null_as_default")]
    pub heading: String,
    #[serde(rename = "content_md", deserialize_with = "null_as_default")]
    pub body: String,
}

/// Stock-photo search hint. Index 0 is the cover, the rest are inline images.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageQuery {
    #[serde(deserialize_with = "null_as_default")]
    pub topic: String,
    #[serde(deserialize_with = "null_as_default")]
    pub style: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Source {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
}

impl ArticlePayload {
    /// Query for the cover image: the first image query, else `topic`.
    pub fn cover_query<'a>(&'a self, topic: &'a str) -> &'a str {
        self.image_queries
            .first()
            .map(|q| q.topic.trim())
            .filter(|q| !q.is_empty())
            .unwrap_or(topic)
    }

    /// Queries for up to `limit` inline images, with blank entries replaced by `topic`.
    pub fn inline_queries<'a>(&'a self, topic: &'a str, limit: usize) -> Vec<&'a str> {
        self.image_queries
            .iter()
            .skip(1)
            .take(limit)
            .map(|q| {
                let q = q.topic.trim();
                if q.is_empty() {
                    topic
                } else {
                    q
                }
            })
            .collect()
    }
}
