//! In-memory doubles for pipeline tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use uuid::Uuid;
use vantage_core::{PersonaConfig, PipelineKind, RawArticle, RunStatus, SourceDescriptor, SourceType, TriggerKind};
use vantage_db::{
    AnalysisRow, BriefingRow, DbError, EnrichedArticleRow, NewAnalysis, NewArticle, NewBriefing,
    NewConnection, NewEnrichment, NewPipelineRun, PersonaRow, PipelineRunRow, Reservation,
    SourceRow, TopicArticleRow, UnenrichedArticleRow, UsageCountRow,
};
use vantage_llm::{Completion, CompletionRequest, CompletionService, LlmError};
use vantage_pipeline::{Pipeline, PipelineSettings, PipelineStore};
use vantage_sources::{Connector, ConnectorRegistry, SourceError};

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StoredArticle {
    pub id: Uuid,
    pub article: NewArticle,
}

#[derive(Debug, Default)]
pub struct State {
    pub sources: Vec<SourceRow>,
    pub fetched_sources: Vec<Uuid>,
    pub articles: Vec<StoredArticle>,
    pub personas: Vec<PersonaRow>,
    pub enrichments: Vec<NewEnrichment>,
    pub connections: Vec<NewConnection>,
    pub briefings: Vec<BriefingRow>,
    pub analyses: Vec<AnalysisRow>,
    pub runs: Vec<PipelineRunRow>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    pub state: Mutex<State>,
}

impl MemoryStore {
    pub fn with_default_persona() -> (Arc<Self>, Uuid) {
        let store = Arc::new(Self::default());
        let id = store.add_persona("Engineer", true);
        (store, id)
    }

    pub fn add_persona(&self, name: &str, is_default: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().unwrap().personas.push(PersonaRow {
            id,
            name: name.to_string(),
            description: None,
            config: Json(PersonaConfig::default()),
            is_default,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        id
    }

    pub fn add_source(&self, name: &str, source_type: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().unwrap().sources.push(SourceRow {
            id,
            name: name.to_string(),
            source_type: source_type.to_string(),
            url: format!("https://{}.example.com/feed", name.to_lowercase()),
            category: "tech".to_string(),
            enabled: true,
            fetch_interval_minutes: 60,
            last_fetched_at: None,
            metadata: serde_json::json!({}),
            created_at: Utc::now(),
        });
        id
    }

    /// Insert an article directly, bypassing the normalizer.
    pub fn add_article(&self, source_id: Uuid, title: &str, published_at: DateTime<Utc>) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().unwrap().articles.push(StoredArticle {
            id,
            article: NewArticle {
                source_id,
                external_id: title.to_string(),
                title: title.to_string(),
                url: format!("https://example.com/{id}"),
                content: format!("{title} body"),
                summary: None,
                author: None,
                published_at,
                categories: Vec::new(),
                metadata: serde_json::json!({}),
                content_hash: id.to_string(),
            },
        });
        id
    }

    pub fn article_count(&self) -> usize {
        self.state.lock().unwrap().articles.len()
    }

    pub fn enrichment_count(&self) -> usize {
        self.state.lock().unwrap().enrichments.len()
    }

    pub fn runs(&self) -> Vec<PipelineRunRow> {
        self.state.lock().unwrap().runs.clone()
    }

    fn source_name(state: &State, source_id: Uuid) -> String {
        state
            .sources
            .iter()
            .find(|s| s.id == source_id)
            .map_or_else(|| "Unknown".to_string(), |s| s.name.clone())
    }

    fn run_row(
        pipeline: PipelineKind,
        trigger: TriggerKind,
        status: RunStatus,
        run_date: NaiveDate,
    ) -> PipelineRunRow {
        PipelineRunRow {
            id: Uuid::new_v4(),
            pipeline: pipeline.as_str().to_string(),
            trigger_kind: trigger.as_str().to_string(),
            status: status.as_str().to_string(),
            token_count: 0,
            items_processed: 0,
            error_message: None,
            run_date,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    fn ensure_running(&self, run_id: Uuid) -> Result<(), DbError> {
        let state = self.state.lock().unwrap();
        match state.runs.iter().find(|r| r.id == run_id) {
            Some(r) if r.status == RunStatus::Running.as_str() => Ok(()),
            _ => Err(DbError::InvalidRunTransition {
                id: run_id,
                expected_status: "running",
            }),
        }
    }
}

#[async_trait]
impl PipelineStore for MemoryStore {
    async fn list_enabled_sources(&self) -> Result<Vec<SourceRow>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state.sources.iter().filter(|s| s.enabled).cloned().collect())
    }

    async fn mark_source_fetched(&self, source_id: Uuid) -> Result<(), DbError> {
        self.state.lock().unwrap().fetched_sources.push(source_id);
        Ok(())
    }

    async fn article_exists_by_hash(&self, content_hash: &str) -> Result<bool, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .articles
            .iter()
            .any(|a| a.article.content_hash == content_hash))
    }

    async fn insert_article(&self, article: &NewArticle) -> Result<bool, DbError> {
        let mut state = self.state.lock().unwrap();
        if state
            .articles
            .iter()
            .any(|a| a.article.content_hash == article.content_hash)
        {
            return Ok(false);
        }
        state.articles.push(StoredArticle {
            id: Uuid::new_v4(),
            article: article.clone(),
        });
        Ok(true)
    }

    async fn list_unenriched_articles(
        &self,
        persona_id: Uuid,
        limit: i64,
    ) -> Result<Vec<UnenrichedArticleRow>, DbError> {
        let state = self.state.lock().unwrap();
        let mut rows: Vec<UnenrichedArticleRow> = state
            .articles
            .iter()
            .filter(|a| {
                !state
                    .enrichments
                    .iter()
                    .any(|e| e.article_id == a.id && e.persona_id == persona_id)
            })
            .map(|a| UnenrichedArticleRow {
                id: a.id,
                title: a.article.title.clone(),
                content: a.article.content.clone(),
                published_at: a.article.published_at,
                source_name: Self::source_name(&state, a.article.source_id),
            })
            .collect();
        rows.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn search_articles_by_title(
        &self,
        topic: &str,
        persona_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<TopicArticleRow>, DbError> {
        let state = self.state.lock().unwrap();
        let needle = topic.to_lowercase();
        let mut rows: Vec<TopicArticleRow> = state
            .articles
            .iter()
            .filter(|a| a.article.title.to_lowercase().contains(&needle))
            .map(|a| TopicArticleRow {
                id: a.id,
                title: a.article.title.clone(),
                source_name: Self::source_name(&state, a.article.source_id),
                content: a.article.content.clone(),
                summary: a.article.summary.clone(),
                executive_summary: state
                    .enrichments
                    .iter()
                    .find(|e| e.article_id == a.id && Some(e.persona_id) == persona_id)
                    .map(|e| e.executive_summary.clone()),
                published_at: a.article.published_at,
            })
            .collect();
        rows.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn get_persona(&self, id: Uuid) -> Result<Option<PersonaRow>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state.personas.iter().find(|p| p.id == id).cloned())
    }

    async fn get_default_persona(&self) -> Result<Option<PersonaRow>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state.personas.iter().find(|p| p.is_default).cloned())
    }

    async fn insert_enrichment(&self, enrichment: &NewEnrichment) -> Result<bool, DbError> {
        let mut state = self.state.lock().unwrap();
        if state
            .enrichments
            .iter()
            .any(|e| e.article_id == enrichment.article_id && e.persona_id == enrichment.persona_id)
        {
            return Ok(false);
        }
        state.enrichments.push(enrichment.clone());
        Ok(true)
    }

    async fn list_recent_enriched(
        &self,
        persona_id: Uuid,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<EnrichedArticleRow>, DbError> {
        let state = self.state.lock().unwrap();
        let mut rows: Vec<EnrichedArticleRow> = state
            .enrichments
            .iter()
            .filter(|e| e.persona_id == persona_id)
            .filter_map(|e| {
                let a = state.articles.iter().find(|a| a.id == e.article_id)?;
                (a.article.published_at >= since).then(|| EnrichedArticleRow {
                    article_id: a.id,
                    title: a.article.title.clone(),
                    url: a.article.url.clone(),
                    source_name: Self::source_name(&state, a.article.source_id),
                    published_at: a.article.published_at,
                    executive_summary: e.executive_summary.clone(),
                    relevance_score: e.relevance_score,
                    impact_level: e.impact_level.as_str().to_string(),
                    category_tags: e.category_tags.clone(),
                })
            })
            .collect();
        rows.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn insert_connections(&self, connections: &[NewConnection]) -> Result<u64, DbError> {
        let mut state = self.state.lock().unwrap();
        state.connections.extend_from_slice(connections);
        Ok(connections.len() as u64)
    }

    async fn insert_briefing(&self, briefing: &NewBriefing) -> Result<BriefingRow, DbError> {
        let row = BriefingRow {
            id: Uuid::new_v4(),
            persona_id: briefing.persona_id,
            content: briefing.content.clone(),
            article_ids: briefing.article_ids.clone(),
            generated_at: Utc::now(),
            model_used: briefing.model_used.clone(),
            token_count: briefing.token_count,
        };
        self.state.lock().unwrap().briefings.push(row.clone());
        Ok(row)
    }

    async fn insert_analysis(&self, analysis: &NewAnalysis) -> Result<AnalysisRow, DbError> {
        let row = AnalysisRow {
            id: Uuid::new_v4(),
            persona_id: analysis.persona_id,
            analysis_type: analysis.analysis_type.as_str().to_string(),
            topic: analysis.topic.clone(),
            title: analysis.title.clone(),
            content: analysis.content.clone(),
            article_ids: analysis.article_ids.clone(),
            model_used: analysis.model_used.clone(),
            token_count: analysis.token_count,
            created_at: Utc::now(),
        };
        self.state.lock().unwrap().analyses.push(row.clone());
        Ok(row)
    }

    async fn count_successful_runs(
        &self,
        pipeline: PipelineKind,
        trigger: TriggerKind,
        run_date: NaiveDate,
    ) -> Result<i64, DbError> {
        let state = self.state.lock().unwrap();
        let count = state
            .runs
            .iter()
            .filter(|r| {
                r.pipeline == pipeline.as_str()
                    && r.trigger_kind == trigger.as_str()
                    && r.run_date == run_date
                    && r.status == RunStatus::Success.as_str()
            })
            .count();
        Ok(i64::try_from(count).unwrap())
    }

    async fn insert_pipeline_run(&self, run: &NewPipelineRun) -> Result<PipelineRunRow, DbError> {
        let mut row = Self::run_row(run.pipeline, run.trigger, run.status, run.run_date);
        row.token_count = run.token_count;
        row.items_processed = run.items_processed;
        row.error_message = run.error_message.clone();
        row.completed_at = Some(Utc::now());
        self.state.lock().unwrap().runs.push(row.clone());
        Ok(row)
    }

    async fn reserve_pipeline_run(
        &self,
        pipeline: PipelineKind,
        trigger: TriggerKind,
        run_date: NaiveDate,
        limit: i64,
        stale_after_secs: i64,
    ) -> Result<Reservation, DbError> {
        let mut state = self.state.lock().unwrap();
        let cutoff = Utc::now() - chrono::Duration::seconds(stale_after_secs);
        let used = state
            .runs
            .iter()
            .filter(|r| {
                r.pipeline == pipeline.as_str()
                    && r.trigger_kind == trigger.as_str()
                    && r.run_date == run_date
                    && (r.status == RunStatus::Success.as_str()
                        || (r.status == RunStatus::Running.as_str() && r.created_at > cutoff))
            })
            .count();
        let used = i64::try_from(used).unwrap();
        if used >= limit {
            return Ok(Reservation::Denied { used });
        }
        let row = Self::run_row(pipeline, trigger, RunStatus::Running, run_date);
        state.runs.push(row.clone());
        Ok(Reservation::Reserved(row))
    }

    async fn complete_pipeline_run(
        &self,
        run_id: Uuid,
        items_processed: i32,
        token_count: i64,
    ) -> Result<(), DbError> {
        self.ensure_running(run_id)?;
        let mut state = self.state.lock().unwrap();
        if let Some(r) = state.runs.iter_mut().find(|r| r.id == run_id) {
            r.status = RunStatus::Success.as_str().to_string();
            r.items_processed = items_processed;
            r.token_count = token_count;
            r.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn fail_pipeline_run(&self, run_id: Uuid, error_message: &str) -> Result<(), DbError> {
        self.ensure_running(run_id)?;
        let mut state = self.state.lock().unwrap();
        if let Some(r) = state.runs.iter_mut().find(|r| r.id == run_id) {
            r.status = RunStatus::Failed.as_str().to_string();
            r.error_message = Some(error_message.to_string());
            r.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn usage_for_date(&self, run_date: NaiveDate) -> Result<Vec<UsageCountRow>, DbError> {
        let state = self.state.lock().unwrap();
        let mut rows: Vec<UsageCountRow> = Vec::new();
        for run in state
            .runs
            .iter()
            .filter(|r| r.run_date == run_date && r.status == RunStatus::Success.as_str())
        {
            if let Some(row) = rows
                .iter_mut()
                .find(|u| u.pipeline == run.pipeline && u.trigger_kind == run.trigger_kind)
            {
                row.successes += 1;
                row.tokens += run.token_count;
            } else {
                rows.push(UsageCountRow {
                    pipeline: run.pipeline.clone(),
                    trigger_kind: run.trigger_kind.clone(),
                    successes: 1,
                    tokens: run.token_count,
                });
            }
        }
        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

/// Replies from a queue, in order. An exhausted queue is an error.
#[derive(Debug, Default)]
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<Result<String, String>>>,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn new(replies: Vec<Result<String, String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(Completion {
                text,
                input_tokens: 100,
                output_tokens: 50,
            }),
            Some(Err(message)) => Err(LlmError::MalformedResponse(message)),
            None => Err(LlmError::MalformedResponse("script exhausted".to_string())),
        }
    }
}

pub fn enrichment_json(relevance: f64) -> String {
    serde_json::json!({
        "executiveSummary": "A concise summary.",
        "relevanceScore": relevance,
        "impactLevel": "high",
        "sentiment": "neutral",
        "entities": [{"name": "OpenSSH", "type": "technology"}],
        "categoryTags": ["security"],
        "keyFacts": ["A fact."],
        "connectionHints": []
    })
    .to_string()
}

// ---------------------------------------------------------------------------
// Connectors
// ---------------------------------------------------------------------------

/// Returns the same titles for every source of its type.
#[derive(Debug)]
pub struct StaticConnector {
    pub source_type: SourceType,
    pub titles: Vec<String>,
    pub fail: bool,
}

#[async_trait]
impl Connector for StaticConnector {
    fn source_type(&self) -> SourceType {
        self.source_type
    }

    async fn fetch(&self, source: &SourceDescriptor) -> Result<Vec<RawArticle>, SourceError> {
        if self.fail {
            return Err(SourceError::InvalidConfig("upstream unavailable".to_string()));
        }
        Ok(self
            .titles
            .iter()
            .map(|title| RawArticle {
                source_id: source.id,
                external_id: title.clone(),
                title: title.clone(),
                url: format!("https://example.com/{}", title.replace(' ', "-")),
                content: format!("<p>{title}</p>"),
                summary: None,
                author: None,
                published_at: Utc::now(),
                categories: Vec::new(),
                metadata: serde_json::json!({}),
            })
            .collect())
    }
}

pub fn pipeline(store: Arc<MemoryStore>, connectors: ConnectorRegistry) -> Pipeline {
    let settings = PipelineSettings {
        enrich_delay: std::time::Duration::ZERO,
        ..PipelineSettings::default()
    };
    Pipeline::new(store, connectors, settings)
}
