//! Database operations for the `analyses` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use vantage_core::AnalysisKind;

use crate::DbError;

#[derive(Debug, Clone, PartialEq)]
pub struct NewAnalysis {
    pub persona_id: Option<Uuid>,
    pub analysis_type: AnalysisKind,
    pub topic: String,
    pub title: String,
    pub content: String,
    pub article_ids: Vec<Uuid>,
    pub model_used: String,
    pub token_count: i32,
}

/// A row from the `analyses` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnalysisRow {
    pub id: Uuid,
    pub persona_id: Option<Uuid>,
    pub analysis_type: String,
    pub topic: String,
    pub title: String,
    pub content: String,
    pub article_ids: Vec<Uuid>,
    pub model_used: String,
    pub token_count: i32,
    pub created_at: DateTime<Utc>,
}

const ANALYSIS_COLUMNS: &str = "id, persona_id, analysis_type, topic, title, content, \
     article_ids, model_used, token_count, created_at";

/// Stores an analysis report and returns the new row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_analysis(pool: &PgPool, analysis: &NewAnalysis) -> Result<AnalysisRow, DbError> {
    let row = sqlx::query_as::<_, AnalysisRow>(&format!(
        "INSERT INTO analyses (id, persona_id, analysis_type, topic, title, content, \
                               article_ids, model_used, token_count) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING {ANALYSIS_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(analysis.persona_id)
    .bind(analysis.analysis_type.as_str())
    .bind(&analysis.topic)
    .bind(&analysis.title)
    .bind(&analysis.content)
    .bind(&analysis.article_ids)
    .bind(&analysis.model_used)
    .bind(analysis.token_count)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// The most recent `limit` analyses, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_analyses(pool: &PgPool, limit: i64) -> Result<Vec<AnalysisRow>, DbError> {
    let rows = sqlx::query_as::<_, AnalysisRow>(&format!(
        "SELECT {ANALYSIS_COLUMNS} FROM analyses \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetches one analysis by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no analysis has the given id, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_analysis(pool: &PgPool, id: Uuid) -> Result<AnalysisRow, DbError> {
    let row = sqlx::query_as::<_, AnalysisRow>(&format!(
        "SELECT {ANALYSIS_COLUMNS} FROM analyses WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}
