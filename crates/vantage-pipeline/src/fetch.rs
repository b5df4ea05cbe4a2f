//! Fetch orchestrator: every enabled source, bounded concurrency.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use vantage_db::SourceRow;

use crate::error::PipelineError;
use crate::normalize::normalize_and_store;
use crate::usage::RunMetrics;
use crate::{to_i32, Pipeline, MAX_CONCURRENT_SOURCES};

/// Per-source outcome. `error` is set when the source contributed nothing
/// because of a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceFetchResult {
    pub source: String,
    pub fetched: usize,
    pub inserted: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FetchReport {
    pub total_fetched: usize,
    pub total_inserted: usize,
    pub total_skipped: usize,
    pub errors: Vec<String>,
    pub sources: Vec<SourceFetchResult>,
}

impl RunMetrics for FetchReport {
    fn items_processed(&self) -> i32 {
        to_i32(self.total_inserted)
    }

    fn total_tokens(&self) -> i64 {
        0
    }
}

impl Pipeline {
    /// Fetch and store every enabled source.
    ///
    /// A failing source is recorded in the report and never aborts the run.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Db`] only if the enabled-source list cannot
    /// be read.
    pub async fn run_fetch(&self) -> Result<FetchReport, PipelineError> {
        let sources = self.store.list_enabled_sources().await?;
        let width = self
            .settings
            .max_concurrent_sources
            .clamp(1, MAX_CONCURRENT_SOURCES);

        tracing::info!(sources = sources.len(), width, "fetch started");

        let fetches: Vec<_> = sources.iter().map(|source| self.fetch_one(source)).collect();
        let mut results: Vec<SourceFetchResult> = stream::iter(fetches)
            .buffer_unordered(width)
            .collect()
            .await;
        results.sort_by(|a, b| a.source.cmp(&b.source));

        let mut report = FetchReport::default();
        for result in &results {
            report.total_fetched += result.fetched;
            report.total_inserted += result.inserted;
            report.total_skipped += result.skipped;
            if let Some(error) = &result.error {
                report.errors.push(error.clone());
            }
        }
        report.sources = results;

        tracing::info!(
            fetched = report.total_fetched,
            inserted = report.total_inserted,
            skipped = report.total_skipped,
            errors = report.errors.len(),
            "fetch finished"
        );
        Ok(report)
    }

    async fn fetch_one(&self, source: &SourceRow) -> SourceFetchResult {
        let mut result = SourceFetchResult {
            source: source.name.clone(),
            ..SourceFetchResult::default()
        };

        let descriptor = match source.descriptor() {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(source = %source.name, error = %e, "source has an unusable type tag");
                result.error = Some(format!(
                    "No connector for source type: {}",
                    source.source_type
                ));
                return result;
            }
        };
        let Some(connector) = self.connectors.get(descriptor.source_type) else {
            result.error = Some(format!(
                "No connector for source type: {}",
                descriptor.source_type
            ));
            return result;
        };

        let articles = match connector.fetch(&descriptor).await {
            Ok(articles) => articles,
            Err(e) => {
                tracing::warn!(source = %source.name, error = %e, "source fetch failed");
                result.error = Some(format!("Failed to process {}: {e}", source.name));
                return result;
            }
        };
        result.fetched = articles.len();

        match normalize_and_store(self.store.as_ref(), &articles).await {
            Ok(outcome) => {
                result.inserted = outcome.inserted;
                result.skipped = outcome.skipped;
            }
            Err(e) => {
                tracing::warn!(source = %source.name, error = %e, "storing fetched articles failed");
                result.error = Some(format!("Failed to process {}: {e}", source.name));
                return result;
            }
        }

        if let Err(e) = self.store.mark_source_fetched(source.id).await {
            tracing::warn!(source = %source.name, error = %e, "could not update last_fetched_at");
        }

        tracing::debug!(
            source = %source.name,
            fetched = result.fetched,
            inserted = result.inserted,
            skipped = result.skipped,
            "source fetched"
        );
        result
    }
}
