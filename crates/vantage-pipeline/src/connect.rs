//! Connection finder: one completion over a batch of recent enrichments.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use serde::Serialize;
use uuid::Uuid;
use vantage_db::NewConnection;
use vantage_llm::CompletionRequest;

use crate::error::PipelineError;
use crate::parse::{parse_connections, ConnectionProposal};
use crate::prompts::{connection_prompt, CONNECT_SYSTEM};
use crate::usage::RunMetrics;
use crate::{to_i32, to_i64, Pipeline};

const LOOKBACK_HOURS: i64 = 48;
const BATCH_SIZE: i64 = 30;
const CONNECT_MAX_TOKENS: u32 = 4096;
const CONNECT_TEMPERATURE: f32 = 0.2;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectReport {
    pub persona_id: Uuid,
    pub articles_considered: usize,
    pub connections_found: usize,
    pub connections_inserted: u64,
    pub total_tokens: u64,
}

impl RunMetrics for ConnectReport {
    fn items_processed(&self) -> i32 {
        to_i32(self.connections_found)
    }

    fn total_tokens(&self) -> i64 {
        to_i64(self.total_tokens)
    }
}

impl Pipeline {
    /// Propose and store relationships among recently enriched articles.
    ///
    /// With fewer than two candidates the completion service is not called.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoPersona`] when no persona resolves, and
    /// propagates completion, parse and storage failures; nothing is stored
    /// when the run fails.
    pub async fn run_connect(&self, persona_id: Option<Uuid>) -> Result<ConnectReport, PipelineError> {
        let persona = self.resolve_persona(persona_id).await?;
        let since = Utc::now() - Duration::hours(LOOKBACK_HOURS);
        let batch = self
            .store
            .list_recent_enriched(persona.id, since, BATCH_SIZE)
            .await?;

        let mut report = ConnectReport {
            persona_id: persona.id,
            articles_considered: batch.len(),
            ..ConnectReport::default()
        };

        if batch.len() < 2 {
            tracing::info!(candidates = batch.len(), "too few enriched articles to connect");
            return Ok(report);
        }

        let completion = self.completion()?;
        let model = &self.settings.models.connect;
        let request = CompletionRequest {
            model: model.clone(),
            system: Some(CONNECT_SYSTEM.to_string()),
            prompt: connection_prompt(&batch),
            max_tokens: CONNECT_MAX_TOKENS,
            temperature: CONNECT_TEMPERATURE,
        };
        let result = completion.complete(&request).await?;
        report.total_tokens = u64::from(result.total_tokens());

        let proposals = parse_connections(&result.text)?;
        let members: HashSet<Uuid> = batch.iter().map(|a| a.article_id).collect();
        let proposed = proposals.len();
        let valid = contained_connections(proposals, &members);
        report.connections_found = valid.len();

        if proposed > valid.len() {
            tracing::warn!(
                dropped = proposed - valid.len(),
                "discarded connections outside the batch"
            );
        }

        if !valid.is_empty() {
            report.connections_inserted = self.store.insert_connections(&valid).await?;
        }

        tracing::info!(
            considered = report.articles_considered,
            found = report.connections_found,
            inserted = report.connections_inserted,
            tokens = report.total_tokens,
            "connection finding finished"
        );
        Ok(report)
    }
}

/// Keep proposals whose endpoints are distinct members of `members`.
pub(crate) fn contained_connections(
    proposals: Vec<ConnectionProposal>,
    members: &HashSet<Uuid>,
) -> Vec<NewConnection> {
    proposals
        .into_iter()
        .filter_map(|p| {
            let source = Uuid::parse_str(p.source_article_id.trim()).ok()?;
            let target = Uuid::parse_str(p.target_article_id.trim()).ok()?;
            if source == target || !members.contains(&source) || !members.contains(&target) {
                return None;
            }
            Some(NewConnection {
                source_article_id: source,
                target_article_id: target,
                relationship_type: p.relationship_type,
                reasoning: p.reasoning,
                confidence: p.confidence,
            })
        })
        .collect()
}
