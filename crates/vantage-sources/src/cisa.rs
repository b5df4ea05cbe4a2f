//! CISA Known Exploited Vulnerabilities catalog.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use vantage_core::{RawArticle, SourceDescriptor, SourceType};

use crate::error::SourceError;
use crate::http::{send_json, source_url};
use crate::Connector;

const CATALOG_PAGE: &str = "https://www.cisa.gov/known-exploited-vulnerabilities-catalog";
const LOOKBACK_DAYS: i64 = 14;
const MAX_ITEMS: usize = 20;

#[derive(Debug, Deserialize)]
struct KevCatalog {
    #[serde(default)]
    vulnerabilities: Vec<KevEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KevEntry {
    #[serde(rename = "cveID")]
    cve_id: String,
    vendor_project: String,
    product: String,
    vulnerability_name: String,
    date_added: NaiveDate,
    #[serde(default)]
    short_description: String,
    #[serde(default)]
    required_action: String,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    known_ransomware_campaign_use: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CisaConnector {
    client: Client,
}

impl CisaConnector {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Connector for CisaConnector {
    fn source_type(&self) -> SourceType {
        SourceType::Cisa
    }

    async fn fetch(&self, source: &SourceDescriptor) -> Result<Vec<RawArticle>, SourceError> {
        let url = source_url(source)?;
        let catalog: KevCatalog = match send_json(self.client.get(url), "cisa kev").await {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::warn!(source = %source.name, error = %e, "kev fetch failed");
                return Ok(Vec::new());
            }
        };

        let cutoff = Utc::now().date_naive() - Duration::days(LOOKBACK_DAYS);
        Ok(catalog
            .vulnerabilities
            .into_iter()
            .filter(|v| v.date_added >= cutoff)
            .take(MAX_ITEMS)
            .map(|v| entry_to_article(source, v))
            .collect())
    }
}

fn entry_to_article(source: &SourceDescriptor, entry: KevEntry) -> RawArticle {
    let due = entry.due_date.unwrap_or_else(|| "N/A".to_string());
    let ransomware = entry
        .known_ransomware_campaign_use
        .unwrap_or_else(|| "Unknown".to_string());
    let content = format!(
        "{}\n\nVendor/Project: {}\nProduct: {}\nRequired Action: {}\nDue Date: {due}\nKnown Ransomware Campaign Use: {ransomware}",
        entry.short_description, entry.vendor_project, entry.product, entry.required_action,
    );
    let published_at = entry
        .date_added
        .and_hms_opt(0, 0, 0)
        .map_or_else(Utc::now, |dt| dt.and_utc());

    RawArticle {
        source_id: source.id,
        external_id: format!("cisa-kev-{}", entry.cve_id),
        title: format!("[CISA KEV] {}: {}", entry.cve_id, entry.vulnerability_name),
        url: CATALOG_PAGE.to_string(),
        summary: Some(entry.short_description),
        content,
        author: Some("CISA".to_string()),
        published_at,
        categories: vec![
            "cisa-kev".to_string(),
            "vulnerability".to_string(),
            entry.vendor_project.to_lowercase(),
        ],
        metadata: serde_json::json!({
            "cveId": entry.cve_id,
            "vendor": entry.vendor_project,
            "product": entry.product,
            "dueDate": due,
        }),
    }
}
