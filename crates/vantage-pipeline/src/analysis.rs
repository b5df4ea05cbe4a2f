//! On-demand topic analysis.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vantage_core::AnalysisKind;
use vantage_db::{NewAnalysis, TopicArticleRow};
use vantage_llm::CompletionRequest;

use crate::error::PipelineError;
use crate::parse::parse_markdown;
use crate::prompts::{analysis_prompt, AnalysisSource, ANALYSIS_SYSTEM};
use crate::usage::RunMetrics;
use crate::{to_i32, to_i64, Pipeline};

const ARTICLE_CAP: i64 = 15;
const CONTENT_SUMMARY_CHARS: usize = 300;
const ANALYSIS_MAX_TOKENS: u32 = 8192;
const ANALYSIS_TEMPERATURE: f32 = 0.4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub topic: String,
    #[serde(rename = "type")]
    pub kind: AnalysisKind,
    #[serde(default)]
    pub persona_id: Option<Uuid>,
}

impl AnalysisRequest {
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidRequest`] for a blank topic.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.topic.trim().is_empty() {
            return Err(PipelineError::InvalidRequest(
                "topic must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    pub analysis_id: Uuid,
    pub title: String,
    pub article_count: usize,
    pub total_tokens: u64,
}

impl RunMetrics for AnalysisReport {
    fn items_processed(&self) -> i32 {
        to_i32(self.article_count)
    }

    fn total_tokens(&self) -> i64 {
        to_i64(self.total_tokens)
    }
}

impl Pipeline {
    /// Write an analysis report on a topic from matching archive articles.
    ///
    /// A persona is optional here; when one resolves it conditions the prompt
    /// and prefers that persona's enrichment summaries.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidRequest`] for a blank topic and
    /// propagates persona, completion, parse and storage failures.
    pub async fn run_analysis(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisReport, PipelineError> {
        request.validate()?;
        let topic = request.topic.trim();
        let persona = self.find_persona(request.persona_id).await?;

        let articles = self
            .store
            .search_articles_by_title(topic, persona.as_ref().map(|p| p.id), ARTICLE_CAP)
            .await?;
        let sources: Vec<AnalysisSource> = articles.iter().map(analysis_source).collect();

        let completion = self.completion()?;
        let model = &self.settings.models.analysis;
        let completion_request = CompletionRequest {
            model: model.clone(),
            system: Some(ANALYSIS_SYSTEM.to_string()),
            prompt: analysis_prompt(
                topic,
                request.kind,
                &sources,
                persona.as_ref().map(|p| &p.config),
            ),
            max_tokens: ANALYSIS_MAX_TOKENS,
            temperature: ANALYSIS_TEMPERATURE,
        };
        let result = completion.complete(&completion_request).await?;
        let tokens = u64::from(result.total_tokens());
        let content = parse_markdown(&result.text)?;

        let title = format!("{} Analysis: {topic}", request.kind.label());
        let row = self
            .store
            .insert_analysis(&NewAnalysis {
                persona_id: persona.as_ref().map(|p| p.id),
                analysis_type: request.kind,
                topic: topic.to_string(),
                title: title.clone(),
                content,
                article_ids: articles.iter().map(|a| a.id).collect(),
                model_used: model.clone(),
                token_count: i32::try_from(tokens).unwrap_or(i32::MAX),
            })
            .await?;

        tracing::info!(analysis_id = %row.id, kind = %request.kind, articles = articles.len(), "analysis written");
        Ok(AnalysisReport {
            analysis_id: row.id,
            title,
            article_count: articles.len(),
            total_tokens: tokens,
        })
    }
}

fn analysis_source(article: &TopicArticleRow) -> AnalysisSource {
    let summary = article
        .executive_summary
        .clone()
        .or_else(|| article.summary.clone())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| article.content.chars().take(CONTENT_SUMMARY_CHARS).collect());

    AnalysisSource {
        title: article.title.clone(),
        source_name: article.source_name.clone(),
        summary,
    }
}
