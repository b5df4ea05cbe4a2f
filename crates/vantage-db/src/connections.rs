//! Database operations for the `article_connections` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use vantage_core::RelationshipType;

use crate::DbError;

#[derive(Debug, Clone, PartialEq)]
pub struct NewConnection {
    pub source_article_id: Uuid,
    pub target_article_id: Uuid,
    pub relationship_type: RelationshipType,
    pub reasoning: String,
    pub confidence: f64,
}

/// A row from the `article_connections` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConnectionRow {
    pub id: Uuid,
    pub source_article_id: Uuid,
    pub target_article_id: Uuid,
    pub relationship_type: String,
    pub reasoning: String,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

/// Inserts a batch of connections in one transaction.
///
/// An edge whose unordered pair and relationship type already exist (in
/// either direction) is skipped. Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails; the batch is rolled back.
pub async fn insert_connections(
    pool: &PgPool,
    connections: &[NewConnection],
) -> Result<u64, DbError> {
    if connections.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut inserted = 0u64;

    for connection in connections {
        let result = sqlx::query(
            "INSERT INTO article_connections \
                 (id, source_article_id, target_article_id, relationship_type, reasoning, confidence) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(connection.source_article_id)
        .bind(connection.target_article_id)
        .bind(connection.relationship_type.as_str())
        .bind(&connection.reasoning)
        .bind(connection.confidence)
        .execute(&mut *tx)
        .await?;

        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Every edge touching `article_id`, most confident first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_connections_for_article(
    pool: &PgPool,
    article_id: Uuid,
) -> Result<Vec<ConnectionRow>, DbError> {
    let rows = sqlx::query_as::<_, ConnectionRow>(
        "SELECT id, source_article_id, target_article_id, relationship_type, reasoning, \
                confidence, created_at \
         FROM article_connections \
         WHERE source_article_id = $1 OR target_article_id = $1 \
         ORDER BY confidence DESC, created_at DESC",
    )
    .bind(article_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
