//! Storage seam for the pipeline stages.
//!
//! [`PgStore`] forwards to the free functions in `vantage-db`; tests supply an
//! in-memory implementation.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use vantage_core::{PipelineKind, TriggerKind};
use vantage_db::{
    AnalysisRow, BriefingRow, DbError, EnrichedArticleRow, NewAnalysis, NewArticle,
    NewBriefing, NewConnection, NewEnrichment, NewPipelineRun, PersonaRow, PipelineRunRow,
    Reservation, SourceRow, TopicArticleRow, UnenrichedArticleRow, UsageCountRow,
};

#[async_trait]
pub trait PipelineStore: Send + Sync {
    async fn list_enabled_sources(&self) -> Result<Vec<SourceRow>, DbError>;
    async fn mark_source_fetched(&self, source_id: Uuid) -> Result<(), DbError>;

    async fn article_exists_by_hash(&self, content_hash: &str) -> Result<bool, DbError>;
    /// `false` when an article with the same fingerprint already exists.
    async fn insert_article(&self, article: &NewArticle) -> Result<bool, DbError>;
    async fn list_unenriched_articles(
        &self,
        persona_id: Uuid,
        limit: i64,
    ) -> Result<Vec<UnenrichedArticleRow>, DbError>;
    async fn search_articles_by_title(
        &self,
        topic: &str,
        persona_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<TopicArticleRow>, DbError>;

    async fn get_persona(&self, id: Uuid) -> Result<Option<PersonaRow>, DbError>;
    async fn get_default_persona(&self) -> Result<Option<PersonaRow>, DbError>;

    async fn insert_enrichment(&self, enrichment: &NewEnrichment) -> Result<bool, DbError>;
    async fn list_recent_enriched(
        &self,
        persona_id: Uuid,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<EnrichedArticleRow>, DbError>;

    async fn insert_connections(&self, connections: &[NewConnection]) -> Result<u64, DbError>;
    async fn insert_briefing(&self, briefing: &NewBriefing) -> Result<BriefingRow, DbError>;
    async fn insert_analysis(&self, analysis: &NewAnalysis) -> Result<AnalysisRow, DbError>;

    async fn count_successful_runs(
        &self,
        pipeline: PipelineKind,
        trigger: TriggerKind,
        run_date: NaiveDate,
    ) -> Result<i64, DbError>;
    async fn insert_pipeline_run(&self, run: &NewPipelineRun) -> Result<PipelineRunRow, DbError>;
    async fn reserve_pipeline_run(
        &self,
        pipeline: PipelineKind,
        trigger: TriggerKind,
        run_date: NaiveDate,
        limit: i64,
        stale_after_secs: i64,
    ) -> Result<Reservation, DbError>;
    async fn complete_pipeline_run(
        &self,
        run_id: Uuid,
        items_processed: i32,
        token_count: i64,
    ) -> Result<(), DbError>;
    async fn fail_pipeline_run(&self, run_id: Uuid, error_message: &str) -> Result<(), DbError>;
    async fn usage_for_date(&self, run_date: NaiveDate) -> Result<Vec<UsageCountRow>, DbError>;
}

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PipelineStore for PgStore {
    async fn list_enabled_sources(&self) -> Result<Vec<SourceRow>, DbError> {
        vantage_db::list_enabled_sources(&self.pool).await
    }

    async fn mark_source_fetched(&self, source_id: Uuid) -> Result<(), DbError> {
        vantage_db::mark_source_fetched(&self.pool, source_id).await
    }

    async fn article_exists_by_hash(&self, content_hash: &str) -> Result<bool, DbError> {
        vantage_db::article_exists_by_hash(&self.pool, content_hash).await
    }

    async fn insert_article(&self, article: &NewArticle) -> Result<bool, DbError> {
        vantage_db::insert_article(&self.pool, article).await
    }

    async fn list_unenriched_articles(
        &self,
        persona_id: Uuid,
        limit: i64,
    ) -> Result<Vec<UnenrichedArticleRow>, DbError> {
        vantage_db::list_unenriched_articles(&self.pool, persona_id, limit).await
    }

    async fn search_articles_by_title(
        &self,
        topic: &str,
        persona_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<TopicArticleRow>, DbError> {
        vantage_db::search_articles_by_title(&self.pool, topic, persona_id, limit).await
    }

    async fn get_persona(&self, id: Uuid) -> Result<Option<PersonaRow>, DbError> {
        vantage_db::get_persona(&self.pool, id).await
    }

    async fn get_default_persona(&self) -> Result<Option<PersonaRow>, DbError> {
        vantage_db::get_default_persona(&self.pool).await
    }

    async fn insert_enrichment(&self, enrichment: &NewEnrichment) -> Result<bool, DbError> {
        vantage_db::insert_enrichment(&self.pool, enrichment).await
    }

    async fn list_recent_enriched(
        &self,
        persona_id: Uuid,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<EnrichedArticleRow>, DbError> {
        vantage_db::list_recent_enriched(&self.pool, persona_id, since, limit).await
    }

    async fn insert_connections(&self, connections: &[NewConnection]) -> Result<u64, DbError> {
        vantage_db::insert_connections(&self.pool, connections).await
    }

    async fn insert_briefing(&self, briefing: &NewBriefing) -> Result<BriefingRow, DbError> {
        vantage_db::insert_briefing(&self.pool, briefing).await
    }

    async fn insert_analysis(&self, analysis: &NewAnalysis) -> Result<AnalysisRow, DbError> {
        vantage_db::insert_analysis(&self.pool, analysis).await
    }

    async fn count_successful_runs(
        &self,
        pipeline: PipelineKind,
        trigger: TriggerKind,
        run_date: NaiveDate,
    ) -> Result<i64, DbError> {
        vantage_db::count_successful_runs(&self.pool, pipeline, trigger, run_date).await
    }

    async fn insert_pipeline_run(&self, run: &NewPipelineRun) -> Result<PipelineRunRow, DbError> {
        vantage_db::insert_pipeline_run(&self.pool, run).await
    }

    async fn reserve_pipeline_run(
        &self,
        pipeline: PipelineKind,
        trigger: TriggerKind,
        run_date: NaiveDate,
        limit: i64,
        stale_after_secs: i64,
    ) -> Result<Reservation, DbError> {
        vantage_db::reserve_pipeline_run(
            &self.pool,
            pipeline,
            trigger,
            run_date,
            limit,
            stale_after_secs,
        )
        .await
    }

    async fn complete_pipeline_run(
        &self,
        run_id: Uuid,
        items_processed: i32,
        token_count: i64,
    ) -> Result<(), DbError> {
        vantage_db::complete_pipeline_run(&self.pool, run_id, items_processed, token_count).await
    }

    async fn fail_pipeline_run(&self, run_id: Uuid, error_message: &str) -> Result<(), DbError> {
        vantage_db::fail_pipeline_run(&self.pool, run_id, error_message).await
    }

    async fn usage_for_date(&self, run_date: NaiveDate) -> Result<Vec<UsageCountRow>, DbError> {
        vantage_db::usage_for_date(&self.pool, run_date).await
    }
}
