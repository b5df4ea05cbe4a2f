//! Enrichment engine: one completion per unenriched article.

use serde::Serialize;
use uuid::Uuid;
use vantage_db::{NewEnrichment, UnenrichedArticleRow};
use vantage_llm::{CompletionRequest, CompletionService};

use crate::error::PipelineError;
use crate::parse::parse_enrichment;
use crate::persona::ResolvedPersona;
use crate::prompts::{enrichment_prompt, ENRICH_SYSTEM};
use crate::usage::RunMetrics;
use crate::{to_i32, to_i64, Pipeline};

const ENRICH_MAX_TOKENS: u32 = 2048;
const ENRICH_TEMPERATURE: f32 = 0.2;
const ERROR_TITLE_CHARS: usize = 40;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrichReport {
    pub persona_id: Uuid,
    pub enriched: usize,
    /// Articles another run stored first; their completions still cost tokens.
    pub already_enriched: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub total_tokens: u64,
}

impl RunMetrics for EnrichReport {
    fn items_processed(&self) -> i32 {
        to_i32(self.enriched)
    }

    fn total_tokens(&self) -> i64 {
        to_i64(self.total_tokens)
    }
}

impl Pipeline {
    /// Enrich up to `limit` articles the persona has not seen, newest first.
    ///
    /// Per-article failures are collected into the report and never stop the
    /// batch.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoPersona`] when no persona resolves,
    /// [`PipelineError::Completion`] when no completion service is configured,
    /// or [`PipelineError::Db`] if the batch cannot be selected.
    pub async fn run_enrich(
        &self,
        persona_id: Option<Uuid>,
        limit: Option<u32>,
    ) -> Result<EnrichReport, PipelineError> {
        let completion = self.completion()?;
        let persona = self.resolve_persona(persona_id).await?;
        let limit = limit.unwrap_or(self.settings.enrich_limit);

        let articles = self
            .store
            .list_unenriched_articles(persona.id, i64::from(limit))
            .await?;

        tracing::info!(persona = %persona.name, candidates = articles.len(), limit, "enrichment started");

        let mut report = EnrichReport {
            persona_id: persona.id,
            ..EnrichReport::default()
        };

        for (index, article) in articles.iter().enumerate() {
            if index > 0 && !self.settings.enrich_delay.is_zero() {
                tokio::time::sleep(self.settings.enrich_delay).await;
            }

            match self.enrich_one(completion, &persona, article).await {
                Ok(EnrichOutcome::Stored { tokens }) => {
                    report.enriched += 1;
                    report.total_tokens += tokens;
                }
                Ok(EnrichOutcome::AlreadyPresent { tokens }) => {
                    report.already_enriched += 1;
                    report.total_tokens += tokens;
                }
                Err(e) => {
                    tracing::warn!(article_id = %article.id, error = %e, "article enrichment failed");
                    report.failed += 1;
                    report.errors.push(format!(
                        "Failed to enrich \"{}...\": {e}",
                        title_prefix(&article.title)
                    ));
                }
            }
        }

        tracing::info!(
            enriched = report.enriched,
            already_enriched = report.already_enriched,
            failed = report.failed,
            tokens = report.total_tokens,
            "enrichment finished"
        );
        Ok(report)
    }

    async fn enrich_one(
        &self,
        completion: &dyn CompletionService,
        persona: &ResolvedPersona,
        article: &UnenrichedArticleRow,
    ) -> Result<EnrichOutcome, PipelineError> {
        let model = &self.settings.models.enrich;
        let request = CompletionRequest {
            model: model.clone(),
            system: Some(ENRICH_SYSTEM.to_string()),
            prompt: enrichment_prompt(article, &persona.config),
            max_tokens: ENRICH_MAX_TOKENS,
            temperature: ENRICH_TEMPERATURE,
        };
        let result = completion.complete(&request).await?;
        let tokens = u64::from(result.total_tokens());
        let parsed = parse_enrichment(&result.text)?;

        let enrichment = NewEnrichment {
            article_id: article.id,
            persona_id: persona.id,
            executive_summary: parsed.executive_summary,
            relevance_score: parsed.relevance_score,
            impact_level: parsed.impact_level,
            sentiment: parsed.sentiment,
            entities: parsed.entities,
            category_tags: parsed.category_tags,
            key_facts: parsed.key_facts,
            connection_hints: parsed.connection_hints,
            model_used: model.clone(),
            token_count: i32::try_from(tokens).unwrap_or(i32::MAX),
        };
        if self.store.insert_enrichment(&enrichment).await? {
            Ok(EnrichOutcome::Stored { tokens })
        } else {
            tracing::debug!(article_id = %article.id, "enrichment already present");
            Ok(EnrichOutcome::AlreadyPresent { tokens })
        }
    }
}

enum EnrichOutcome {
    Stored { tokens: u64 },
    /// Lost the `(article, persona)` unique key to a concurrent run.
    AlreadyPresent { tokens: u64 },
}

fn title_prefix(title: &str) -> String {
    title.chars().take(ERROR_TITLE_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::title_prefix;

    #[test]
    fn title_prefix_counts_characters() {
        let title = "é".repeat(50);
        assert_eq!(title_prefix(&title).chars().count(), 40);
        assert_eq!(title_prefix("short"), "short");
    }
}
