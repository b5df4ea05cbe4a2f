use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Connector output, consumed by the normalizer and never stored as-is.
///
/// `(source_id, external_id)` identifies an item within one connector; the
/// stored dedup key is derived from `title` and `url` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawArticle {
    pub source_id: Uuid,
    pub external_id: String,
    pub title: String,
    pub url: String,
    pub content: String,
    pub summary: Option<String>,
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
    pub categories: Vec<String>,
    pub metadata: serde_json::Value,
}
