//! Hacker News stories via the Algolia search API.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use vantage_core::{RawArticle, SourceDescriptor, SourceType};

use crate::error::SourceError;
use crate::http::{endpoint, send_json, slug, source_url};
use crate::Connector;

pub const KEYWORDS: &[&str] = &[
    "cybersecurity",
    "data breach",
    "ransomware",
    "zero-day",
    "CrowdStrike",
    "vulnerability",
    "CISO",
    "threat intelligence",
    "AI security",
    "cloud security",
];

const QUERIES_PER_RUN: usize = 5;
const HITS_PER_QUERY: u32 = 5;
const DEFAULT_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "objectID")]
    object_id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    story_text: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    points: Option<i64>,
    #[serde(default)]
    num_comments: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct HackerNewsConnector {
    client: Client,
    delay: Duration,
}

impl HackerNewsConnector {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            delay: DEFAULT_DELAY,
        }
    }

    /// Override the pause between keyword queries.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    async fn search(&self, base: &reqwest::Url, keyword: &str) -> Result<Vec<Hit>, SourceError> {
        let url = endpoint(base, "search_by_date")?;
        let request = self.client.get(url).query(&[
            ("query", keyword),
            ("tags", "story"),
            ("hitsPerPage", &HITS_PER_QUERY.to_string()),
        ]);
        let response: SearchResponse = send_json(request, "hn search_by_date").await?;
        Ok(response.hits)
    }
}

#[async_trait]
impl Connector for HackerNewsConnector {
    fn source_type(&self) -> SourceType {
        SourceType::HackerNews
    }

    async fn fetch(&self, source: &SourceDescriptor) -> Result<Vec<RawArticle>, SourceError> {
        let base = source_url(source)?;
        let mut seen = HashSet::new();
        let mut articles = Vec::new();

        for (i, keyword) in KEYWORDS.iter().take(QUERIES_PER_RUN).enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let hits = match self.search(&base, keyword).await {
                Ok(hits) => hits,
                Err(e) => {
                    tracing::warn!(source = %source.name, keyword, error = %e, "hn query failed");
                    continue;
                }
            };

            for hit in hits {
                if hit.url.is_none() && hit.story_text.is_none() {
                    continue;
                }
                if !seen.insert(hit.object_id.clone()) {
                    continue;
                }
                articles.push(hit_to_article(source, keyword, hit));
            }
        }

        Ok(articles)
    }
}

fn hit_to_article(source: &SourceDescriptor, keyword: &str, hit: Hit) -> RawArticle {
    let title = hit.title.unwrap_or_else(|| "Untitled".to_string());
    let points = hit.points.unwrap_or(0);
    let comments = hit.num_comments.unwrap_or(0);
    let url = hit
        .url
        .unwrap_or_else(|| format!("https://news.ycombinator.com/item?id={}", hit.object_id));
    let content = hit
        .story_text
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| format!("{title}. Points: {points}, Comments: {comments}"));

    RawArticle {
        source_id: source.id,
        external_id: format!("hn-{}", hit.object_id),
        title,
        url,
        content,
        summary: None,
        author: hit.author,
        published_at: hit.created_at.unwrap_or_else(Utc::now),
        categories: vec!["hackernews".to_string(), slug(keyword)],
        metadata: serde_json::json!({ "points": points, "numComments": comments }),
    }
}
