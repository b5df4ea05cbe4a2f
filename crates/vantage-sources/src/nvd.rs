//! NIST National Vulnerability Database, CVE API 2.0.

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use vantage_core::{RawArticle, SourceDescriptor, SourceType};

use crate::error::SourceError;
use crate::http::{send_json, source_url};
use crate::Connector;

const LOOKBACK_DAYS: i64 = 7;
const RESULTS_PER_PAGE: &str = "20";
const NVD_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

#[derive(Debug, Deserialize)]
struct CveResponse {
    #[serde(default)]
    vulnerabilities: Vec<VulnerabilityItem>,
}

#[derive(Debug, Deserialize)]
struct VulnerabilityItem {
    cve: Cve,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Cve {
    id: String,
    #[serde(default)]
    published: Option<String>,
    #[serde(default)]
    descriptions: Vec<Description>,
    #[serde(default)]
    metrics: Metrics,
}

#[derive(Debug, Deserialize)]
struct Description {
    lang: String,
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Metrics {
    #[serde(default)]
    cvss_metric_v31: Vec<CvssMetric>,
    #[serde(default)]
    cvss_metric_v30: Vec<CvssMetric>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CvssMetric {
    cvss_data: CvssData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CvssData {
    base_score: f64,
    base_severity: String,
}

#[derive(Debug, Clone)]
pub struct NistNvdConnector {
    client: Client,
}

impl NistNvdConnector {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Connector for NistNvdConnector {
    fn source_type(&self) -> SourceType {
        SourceType::NistNvd
    }

    async fn fetch(&self, source: &SourceDescriptor) -> Result<Vec<RawArticle>, SourceError> {
        let url = source_url(source)?;
        let end = Utc::now();
        let start = end - Duration::days(LOOKBACK_DAYS);
        let request = self.client.get(url).query(&[
            ("pubStartDate", start.format(NVD_DATE_FORMAT).to_string().as_str()),
            ("pubEndDate", end.format(NVD_DATE_FORMAT).to_string().as_str()),
            ("resultsPerPage", RESULTS_PER_PAGE),
            ("cvssV3Severity", "HIGH"),
        ]);

        let response: CveResponse = match send_json(request, "nvd cves").await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(source = %source.name, error = %e, "nvd fetch failed");
                return Ok(Vec::new());
            }
        };

        Ok(response
            .vulnerabilities
            .into_iter()
            .map(|item| cve_to_article(source, item.cve))
            .collect())
    }
}

fn cve_to_article(source: &SourceDescriptor, cve: Cve) -> RawArticle {
    let (severity, score) = cve
        .metrics
        .cvss_metric_v31
        .first()
        .or_else(|| cve.metrics.cvss_metric_v30.first())
        .map_or_else(
            || ("UNKNOWN".to_string(), 0.0),
            |m| (m.cvss_data.base_severity.clone(), m.cvss_data.base_score),
        );
    let description = cve
        .descriptions
        .iter()
        .find(|d| d.lang == "en")
        .or_else(|| cve.descriptions.first())
        .map(|d| d.value.clone())
        .unwrap_or_default();
    // NVD timestamps carry no offset; they are UTC.
    let published_at = cve
        .published
        .as_deref()
        .and_then(|p| NaiveDateTime::parse_from_str(p, "%Y-%m-%dT%H:%M:%S%.f").ok())
        .map_or_else(Utc::now, |dt| dt.and_utc());

    RawArticle {
        source_id: source.id,
        external_id: format!("nvd-{}", cve.id),
        title: format!("[CVE] {} ({severity} {score})", cve.id),
        url: format!("https://nvd.nist.gov/vuln/detail/{}", cve.id),
        summary: Some(description.clone()),
        content: description,
        author: Some("NIST NVD".to_string()),
        published_at,
        categories: vec![
            "cve".to_string(),
            severity.to_lowercase(),
            "vulnerability".to_string(),
        ],
        metadata: serde_json::json!({
            "cveId": cve.id,
            "severity": severity,
            "cvssScore": score,
        }),
    }
}
