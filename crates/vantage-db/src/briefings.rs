//! Database operations for the `briefings` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

#[derive(Debug, Clone, PartialEq)]
pub struct NewBriefing {
    pub persona_id: Uuid,
    pub content: String,
    pub article_ids: Vec<Uuid>,
    pub model_used: String,
    pub token_count: i32,
}

/// A row from the `briefings` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BriefingRow {
    pub id: Uuid,
    pub persona_id: Uuid,
    pub content: String,
    pub article_ids: Vec<Uuid>,
    pub generated_at: DateTime<Utc>,
    pub model_used: String,
    pub token_count: i32,
}

const BRIEFING_COLUMNS: &str =
    "id, persona_id, content, article_ids, generated_at, model_used, token_count";

/// Stores a briefing and returns the new row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_briefing(pool: &PgPool, briefing: &NewBriefing) -> Result<BriefingRow, DbError> {
    let row = sqlx::query_as::<_, BriefingRow>(&format!(
        "INSERT INTO briefings (id, persona_id, content, article_ids, generated_at, model_used, token_count) \
         VALUES ($1, $2, $3, $4, NOW(), $5, $6) \
         RETURNING {BRIEFING_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(briefing.persona_id)
    .bind(&briefing.content)
    .bind(&briefing.article_ids)
    .bind(&briefing.model_used)
    .bind(briefing.token_count)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// The most recently generated briefing, optionally for one persona.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_latest_briefing(
    pool: &PgPool,
    persona_id: Option<Uuid>,
) -> Result<Option<BriefingRow>, DbError> {
    let row = sqlx::query_as::<_, BriefingRow>(&format!(
        "SELECT {BRIEFING_COLUMNS} FROM briefings \
         WHERE ($1::uuid IS NULL OR persona_id = $1) \
         ORDER BY generated_at DESC, id DESC \
         LIMIT 1"
    ))
    .bind(persona_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// The most recent `limit` briefings, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_briefings(pool: &PgPool, limit: i64) -> Result<Vec<BriefingRow>, DbError> {
    let rows = sqlx::query_as::<_, BriefingRow>(&format!(
        "SELECT {BRIEFING_COLUMNS} FROM briefings \
         ORDER BY generated_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
