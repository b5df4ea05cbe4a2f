//! Database operations for the `enrichments` table.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;
use vantage_core::{Entity, ImpactLevel, Sentiment};

use crate::DbError;

/// A validated enrichment ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEnrichment {
    pub article_id: Uuid,
    pub persona_id: Uuid,
    pub executive_summary: String,
    pub relevance_score: f64,
    pub impact_level: ImpactLevel,
    pub sentiment: Sentiment,
    pub entities: Vec<Entity>,
    pub category_tags: Vec<String>,
    pub key_facts: Vec<String>,
    pub connection_hints: Vec<String>,
    pub model_used: String,
    pub token_count: i32,
}

/// Enriched article context shared by the connection finder and briefing.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EnrichedArticleRow {
    pub article_id: Uuid,
    pub title: String,
    pub url: String,
    pub source_name: String,
    pub published_at: DateTime<Utc>,
    pub executive_summary: String,
    pub relevance_score: f64,
    pub impact_level: String,
    pub category_tags: Vec<String>,
}

/// Stores an enrichment.
///
/// Returns `false` if the article already has an enrichment for this persona.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_enrichment(pool: &PgPool, enrichment: &NewEnrichment) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO enrichments (id, article_id, persona_id, executive_summary, relevance_score, \
                                  impact_level, sentiment, entities, category_tags, key_facts, \
                                  connection_hints, enriched_at, model_used, token_count) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW(), $12, $13) \
         ON CONFLICT (article_id, persona_id) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(enrichment.article_id)
    .bind(enrichment.persona_id)
    .bind(&enrichment.executive_summary)
    .bind(enrichment.relevance_score)
    .bind(enrichment.impact_level.as_str())
    .bind(enrichment.sentiment.as_str())
    .bind(Json(&enrichment.entities))
    .bind(&enrichment.category_tags)
    .bind(&enrichment.key_facts)
    .bind(&enrichment.connection_hints)
    .bind(&enrichment.model_used)
    .bind(enrichment.token_count)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Enriched articles for `persona_id` published at or after `since`,
/// highest relevance first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_enriched(
    pool: &PgPool,
    persona_id: Uuid,
    since: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<EnrichedArticleRow>, DbError> {
    let rows = sqlx::query_as::<_, EnrichedArticleRow>(
        "SELECT a.id AS article_id, a.title, a.url, s.name AS source_name, a.published_at, \
                e.executive_summary, e.relevance_score, e.impact_level, e.category_tags \
         FROM enrichments e \
         JOIN articles a ON a.id = e.article_id \
         JOIN sources s ON s.id = a.source_id \
         WHERE e.persona_id = $1 AND a.published_at >= $2 \
         ORDER BY e.relevance_score DESC, a.published_at DESC, a.id \
         LIMIT $3",
    )
    .bind(persona_id)
    .bind(since)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
