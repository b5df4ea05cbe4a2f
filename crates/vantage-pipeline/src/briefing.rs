//! Briefing synthesizer: a markdown digest of the last day.

use chrono::{Duration, Utc};
use serde::Serialize;
use uuid::Uuid;
use vantage_db::NewBriefing;
use vantage_llm::CompletionRequest;

use crate::error::PipelineError;
use crate::parse::parse_markdown;
use crate::prompts::{briefing_prompt, BRIEFING_SYSTEM};
use crate::usage::RunMetrics;
use crate::{to_i32, to_i64, Pipeline};

const LOOKBACK_HOURS: i64 = 24;
const ARTICLE_CAP: i64 = 30;
const BRIEFING_MAX_TOKENS: u32 = 8192;
const BRIEFING_TEMPERATURE: f32 = 0.4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BriefingReport {
    pub briefing_id: Uuid,
    pub persona_id: Uuid,
    pub article_count: usize,
    pub total_tokens: u64,
}

impl RunMetrics for BriefingReport {
    fn items_processed(&self) -> i32 {
        to_i32(self.article_count)
    }

    fn total_tokens(&self) -> i64 {
        to_i64(self.total_tokens)
    }
}

impl Pipeline {
    /// Write a briefing from the persona's most relevant articles of the last
    /// 24 hours.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoPersona`] or
    /// [`PipelineError::NoEnrichedArticles`] before any completion call, and
    /// propagates completion, parse and storage failures. No briefing row is
    /// written on error.
    pub async fn run_briefing(
        &self,
        persona_id: Option<Uuid>,
    ) -> Result<BriefingReport, PipelineError> {
        let persona = self.resolve_persona(persona_id).await?;
        let since = Utc::now() - Duration::hours(LOOKBACK_HOURS);
        let articles = self
            .store
            .list_recent_enriched(persona.id, since, ARTICLE_CAP)
            .await?;

        if articles.is_empty() {
            return Err(PipelineError::NoEnrichedArticles);
        }

        let completion = self.completion()?;
        let model = &self.settings.models.briefing;
        let request = CompletionRequest {
            model: model.clone(),
            system: Some(BRIEFING_SYSTEM.to_string()),
            prompt: briefing_prompt(&articles, &persona.config, Utc::now()),
            max_tokens: BRIEFING_MAX_TOKENS,
            temperature: BRIEFING_TEMPERATURE,
        };
        let result = completion.complete(&request).await?;
        let tokens = u64::from(result.total_tokens());
        let content = parse_markdown(&result.text)?;

        let row = self
            .store
            .insert_briefing(&NewBriefing {
                persona_id: persona.id,
                content,
                article_ids: articles.iter().map(|a| a.article_id).collect(),
                model_used: model.clone(),
                token_count: i32::try_from(tokens).unwrap_or(i32::MAX),
            })
            .await?;

        tracing::info!(briefing_id = %row.id, articles = articles.len(), tokens, "briefing written");
        Ok(BriefingReport {
            briefing_id: row.id,
            persona_id: persona.id,
            article_count: articles.len(),
            total_tokens: tokens,
        })
    }
}
