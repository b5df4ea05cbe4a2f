//! SEC EDGAR filings for watchlist tickers.
//!
//! Primary path is the full-text search API. When it refuses a request the
//! connector falls back to the per-company Atom listing on www.sec.gov.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use vantage_core::{RawArticle, SourceDescriptor, SourceType};

use crate::error::SourceError;
use crate::http::{endpoint, send_bytes, send_json, source_url};
use crate::Connector;

const DEFAULT_BROWSE_BASE: &str = "https://www.sec.gov";
const FORMS: &str = "10-K,10-Q,8-K";
const LOOKBACK_DAYS: i64 = 30;
const HITS_PER_TICKER: usize = 5;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source")]
    source: FilingSource,
}

#[derive(Debug, Deserialize)]
struct FilingSource {
    #[serde(default)]
    adsh: Option<String>,
    #[serde(default, alias = "file_type", alias = "form_type")]
    form: Option<String>,
    #[serde(default)]
    file_date: Option<NaiveDate>,
    #[serde(default)]
    display_names: Vec<String>,
    #[serde(default)]
    ciks: Vec<String>,
    #[serde(default)]
    file_description: Option<String>,
}

/// Outcome of the search API for one ticker.
enum SearchOutcome {
    Hits(Vec<SearchHit>),
    Refused(reqwest::StatusCode),
}

#[derive(Debug, Clone)]
pub struct SecEdgarConnector {
    client: Client,
    user_agent: String,
    browse_base: String,
}

impl SecEdgarConnector {
    #[must_use]
    pub fn new(client: Client, user_agent: String) -> Self {
        Self {
            client,
            user_agent,
            browse_base: DEFAULT_BROWSE_BASE.to_string(),
        }
    }

    /// Point the Atom fallback listing at another host.
    #[must_use]
    pub fn with_browse_base_url(mut self, base: &str) -> Self {
        self.browse_base = base.trim_end_matches('/').to_string();
        self
    }

    async fn search(&self, base: &Url, ticker: &str) -> Result<SearchOutcome, SourceError> {
        let url = endpoint(base, "search-index")?;
        let end = Utc::now().date_naive();
        let start = end - Duration::days(LOOKBACK_DAYS);
        let request = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&[
                ("q", format!("\"{ticker}\"")),
                ("forms", FORMS.to_string()),
                ("dateRange", "custom".to_string()),
                ("startdt", start.to_string()),
                ("enddt", end.to_string()),
            ]);

        match send_json::<SearchResponse>(request, &format!("edgar search {ticker}")).await {
            Ok(response) => Ok(SearchOutcome::Hits(response.hits.hits)),
            Err(SourceError::Status { status, .. }) => Ok(SearchOutcome::Refused(status)),
            Err(e) => Err(e),
        }
    }

    async fn browse(&self, source: &SourceDescriptor, ticker: &str) -> Result<Vec<RawArticle>, SourceError> {
        let url = Url::parse(&format!("{}/cgi-bin/browse-edgar", self.browse_base))
            .map_err(|e| SourceError::InvalidConfig(format!("invalid EDGAR browse url: {e}")))?;
        let request = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&[
                ("action", "getcompany"),
                ("CIK", ticker),
                ("type", ""),
                ("dateb", ""),
                ("owner", "include"),
                ("count", "5"),
                ("output", "atom"),
            ]);
        let body = send_bytes(request, &format!("edgar browse {ticker}")).await?;
        let feed = feed_rs::parser::parse(body.as_slice()).map_err(|e| SourceError::Feed {
            context: format!("edgar browse {ticker}"),
            message: e.to_string(),
        })?;

        Ok(feed
            .entries
            .into_iter()
            .take(HITS_PER_TICKER)
            .map(|entry| listing_entry_to_article(source, ticker, &entry))
            .collect())
    }

    async fn fetch_ticker(
        &self,
        source: &SourceDescriptor,
        base: &Url,
        ticker: &str,
    ) -> Result<Vec<RawArticle>, SourceError> {
        match self.search(base, ticker).await? {
            SearchOutcome::Hits(hits) => Ok(hits
                .into_iter()
                .take(HITS_PER_TICKER)
                .map(|hit| search_hit_to_article(source, ticker, hit))
                .collect()),
            SearchOutcome::Refused(status) => {
                tracing::debug!(ticker, %status, "edgar search refused, using browse listing");
                self.browse(source, ticker).await
            }
        }
    }
}

#[async_trait]
impl Connector for SecEdgarConnector {
    fn source_type(&self) -> SourceType {
        SourceType::SecEdgar
    }

    async fn fetch(&self, source: &SourceDescriptor) -> Result<Vec<RawArticle>, SourceError> {
        let base = source_url(source)?;
        let tickers = source.metadata_strings("tickers");
        if tickers.is_empty() {
            tracing::warn!(source = %source.name, "no tickers configured");
            return Ok(Vec::new());
        }

        let mut articles = Vec::new();
        for ticker in &tickers {
            match self.fetch_ticker(source, &base, ticker).await {
                Ok(found) => articles.extend(found),
                Err(e) => {
                    tracing::warn!(source = %source.name, ticker, error = %e, "edgar ticker failed");
                }
            }
        }
        Ok(articles)
    }
}

fn search_hit_to_article(source: &SourceDescriptor, ticker: &str, hit: SearchHit) -> RawArticle {
    let filing = hit.source;
    let accession = filing
        .adsh
        .clone()
        .unwrap_or_else(|| hit.id.split(':').next().unwrap_or(&hit.id).to_string());
    let form = filing.form.unwrap_or_else(|| "Filing".to_string());
    let company = filing
        .display_names
        .first()
        .cloned()
        .unwrap_or_else(|| ticker.to_string());
    let url = match filing.ciks.first() {
        Some(cik) => format!(
            "https://www.sec.gov/Archives/edgar/data/{}/{}/",
            cik.trim_start_matches('0'),
            accession.replace('-', "")
        ),
        None => format!("https://efts.sec.gov/LATEST/search-index?q=%22{ticker}%22"),
    };
    let filed = filing.file_date.map(|d| d.to_string()).unwrap_or_default();
    let description = filing.file_description.unwrap_or_default();
    let published_at = filing
        .file_date
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map_or_else(Utc::now, |dt| dt.and_utc());

    RawArticle {
        source_id: source.id,
        external_id: format!("sec-{accession}"),
        title: format!("[SEC {form}] {company}"),
        url,
        content: format!("{company} filed a {form} on {filed}. {description}").trim().to_string(),
        summary: None,
        author: Some("SEC EDGAR".to_string()),
        published_at,
        categories: vec!["sec-filing".to_string(), form.to_lowercase(), ticker.to_lowercase()],
        metadata: serde_json::json!({ "ticker": ticker, "form": form, "accession": accession }),
    }
}

fn listing_entry_to_article(
    source: &SourceDescriptor,
    ticker: &str,
    entry: &feed_rs::model::Entry,
) -> RawArticle {
    let link = entry.links.first().map(|l| l.href.clone()).unwrap_or_default();
    let accession = accession_from_listing(&entry.id)
        .or_else(|| accession_from_listing(&link))
        .unwrap_or_else(|| entry.id.clone());
    let title = entry
        .title
        .as_ref()
        .map_or_else(|| "Filing".to_string(), |t| t.content.trim().to_string());
    let summary = entry.summary.as_ref().map(|s| s.content.clone());

    RawArticle {
        source_id: source.id,
        external_id: format!("sec-{accession}"),
        title: format!("[SEC] {ticker}: {title}"),
        url: link,
        content: summary.clone().unwrap_or_else(|| title.clone()),
        summary,
        author: Some("SEC EDGAR".to_string()),
        published_at: entry.updated.or(entry.published).unwrap_or_else(Utc::now),
        categories: vec!["sec-filing".to_string(), ticker.to_lowercase()],
        metadata: serde_json::json!({ "ticker": ticker, "accession": accession }),
    }
}

/// Accession number embedded in a browse-listing id, e.g.
/// `urn:tag:sec.gov,2008:accession-number=0001535527-24-000012`.
fn accession_from_listing(value: &str) -> Option<String> {
    value
        .split("accession-number=")
        .nth(1)
        .map(|rest| rest.split(['&', '/']).next().unwrap_or(rest).to_string())
        .filter(|a| !a.is_empty())
}
