//! Subreddit hot listings via the public JSON endpoints.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use vantage_core::{RawArticle, SourceDescriptor, SourceType};

use crate::error::SourceError;
use crate::http::{endpoint, send_json, source_url};
use crate::Connector;

pub const SUBREDDITS: &[&str] = &[
    "cybersecurity",
    "netsec",
    "technology",
    "MachineLearning",
    "artificial",
    "sysadmin",
];

/// Reddit throttles generic user agents hard.
const USER_AGENT: &str = "Vantage:1.0 (by /u/vantage-intel)";
const DEFAULT_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    title: String,
    #[serde(default)]
    url: Option<String>,
    permalink: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: i64,
    #[serde(default)]
    is_self: bool,
}

#[derive(Debug, Clone)]
pub struct RedditConnector {
    client: Client,
    delay: Duration,
}

impl RedditConnector {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            delay: DEFAULT_DELAY,
        }
    }

    /// Override the pause between subreddit requests.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    async fn hot(&self, base: &reqwest::Url, subreddit: &str) -> Result<Vec<Post>, SourceError> {
        let url = endpoint(base, &format!("r/{subreddit}/hot.json"))?;
        let request = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .query(&[("limit", "10")]);
        let listing: Listing = send_json(request, &format!("r/{subreddit}")).await?;
        Ok(listing.data.children.into_iter().map(|c| c.data).collect())
    }
}

#[async_trait]
impl Connector for RedditConnector {
    fn source_type(&self) -> SourceType {
        SourceType::Reddit
    }

    async fn fetch(&self, source: &SourceDescriptor) -> Result<Vec<RawArticle>, SourceError> {
        let base = source_url(source)?;
        let mut articles = Vec::new();

        for (i, subreddit) in SUBREDDITS.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            match self.hot(&base, subreddit).await {
                Ok(posts) => {
                    articles.extend(posts.into_iter().map(|p| post_to_article(source, subreddit, p)));
                }
                Err(e) => {
                    tracing::warn!(source = %source.name, subreddit, error = %e, "subreddit skipped");
                }
            }
        }

        Ok(articles)
    }
}

fn post_to_article(source: &SourceDescriptor, subreddit: &str, post: Post) -> RawArticle {
    let permalink = format!("https://www.reddit.com{}", post.permalink);
    let url = match post.url {
        Some(url) if !post.is_self && !url.is_empty() => url,
        _ => permalink,
    };
    let content = if post.selftext.trim().is_empty() {
        post.title.clone()
    } else {
        post.selftext
    };
    #[allow(clippy::cast_possible_truncation)]
    let published_at =
        DateTime::from_timestamp(post.created_utc as i64, 0).unwrap_or_else(Utc::now);

    RawArticle {
        source_id: source.id,
        external_id: format!("reddit-{}", post.id),
        title: format!("[r/{subreddit}] {}", post.title),
        url,
        content,
        summary: None,
        author: post.author,
        published_at,
        categories: vec!["reddit".to_string(), subreddit.to_lowercase()],
        metadata: serde_json::json!({
            "score": post.score,
            "numComments": post.num_comments,
            "subreddit": subreddit,
        }),
    }
}
