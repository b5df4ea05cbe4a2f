//! RSS, Atom and JSON Feed sources.

use async_trait::async_trait;
use chrono::Utc;
use feed_rs::model::Entry;
use reqwest::Client;
use vantage_core::{RawArticle, SourceDescriptor, SourceType};

use crate::error::SourceError;
use crate::http::{send_bytes, source_url};
use crate::Connector;

const MAX_ITEMS: usize = 15;

#[derive(Debug, Clone)]
pub struct RssConnector {
    client: Client,
}

impl RssConnector {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn fetch_feed(&self, url: reqwest::Url, name: &str) -> Result<feed_rs::model::Feed, SourceError> {
        let body = send_bytes(self.client.get(url), name).await?;
        feed_rs::parser::parse(body.as_slice()).map_err(|e| SourceError::Feed {
            context: name.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl Connector for RssConnector {
    fn source_type(&self) -> SourceType {
        SourceType::Rss
    }

    async fn fetch(&self, source: &SourceDescriptor) -> Result<Vec<RawArticle>, SourceError> {
        let url = source_url(source)?;
        let feed = match self.fetch_feed(url, &source.name).await {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!(source = %source.name, error = %e, "rss fetch failed");
                return Ok(Vec::new());
            }
        };

        Ok(feed
            .entries
            .into_iter()
            .take(MAX_ITEMS)
            .map(|entry| entry_to_article(source, entry))
            .collect())
    }
}

/// Map one feed entry. Feeds vary widely in which fields they fill, so every
/// field has a fallback chain.
pub(crate) fn entry_to_article(source: &SourceDescriptor, entry: Entry) -> RawArticle {
    let title = entry
        .title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());
    let link = entry.links.first().map(|l| l.href.clone()).unwrap_or_default();
    let summary = entry.summary.as_ref().map(|s| s.content.clone());

    let external_id = if !entry.id.trim().is_empty() {
        entry.id.clone()
    } else if !link.is_empty() {
        link.clone()
    } else {
        title.clone()
    };

    let content = entry
        .content
        .as_ref()
        .and_then(|c| c.body.clone())
        .or_else(|| summary.clone())
        .unwrap_or_default();

    RawArticle {
        source_id: source.id,
        external_id,
        title,
        url: link,
        content,
        summary,
        author: entry.authors.first().map(|a| a.name.clone()),
        published_at: entry.published.or(entry.updated).unwrap_or_else(Utc::now),
        categories: entry.categories.iter().map(|c| c.term.clone()).collect(),
        metadata: serde_json::json!({}),
    }
}
