//! Database operations for the `articles` table.
//!
//! Articles are insert-only. `content_hash` carries a unique constraint and
//! every insert uses `ON CONFLICT DO NOTHING`, so concurrent fetches of the
//! same story settle on a single row.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{like_pattern, DbError};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `articles` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArticleRow {
    pub id: Uuid,
    pub source_id: Uuid,
    pub external_id: String,
    pub title: String,
    pub url: String,
    pub content: String,
    pub summary: Option<String>,
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
    pub categories: Vec<String>,
    pub metadata: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
    pub content_hash: String,
}

/// A normalized article ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub source_id: Uuid,
    pub external_id: String,
    pub title: String,
    pub url: String,
    pub content: String,
    pub summary: Option<String>,
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
    pub categories: Vec<String>,
    pub metadata: serde_json::Value,
    pub content_hash: String,
}

/// An article still waiting for enrichment under some persona.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UnenrichedArticleRow {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub published_at: DateTime<Utc>,
    pub source_name: String,
}

/// Article joined with its (optional) enrichment, for the read API.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArticleFeedRow {
    pub id: Uuid,
    pub source_name: String,
    pub source_category: String,
    pub title: String,
    pub url: String,
    pub summary: Option<String>,
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
    pub categories: Vec<String>,
    pub executive_summary: Option<String>,
    pub relevance_score: Option<f64>,
    pub impact_level: Option<String>,
    pub sentiment: Option<String>,
    pub category_tags: Option<Vec<String>>,
}

/// Article context used by topic analysis.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TopicArticleRow {
    pub id: Uuid,
    pub title: String,
    pub source_name: String,
    pub content: String,
    pub summary: Option<String>,
    pub executive_summary: Option<String>,
    pub published_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts an article unless one with the same `content_hash` exists.
///
/// Returns `true` if a row was written, `false` on a hash conflict.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails for any other reason.
pub async fn insert_article(pool: &PgPool, article: &NewArticle) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO articles (id, source_id, external_id, title, url, content, summary, \
                               author, published_at, categories, metadata, fetched_at, content_hash) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW(), $12) \
         ON CONFLICT (content_hash) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(article.source_id)
    .bind(&article.external_id)
    .bind(&article.title)
    .bind(&article.url)
    .bind(&article.content)
    .bind(&article.summary)
    .bind(&article.author)
    .bind(article.published_at)
    .bind(&article.categories)
    .bind(&article.metadata)
    .bind(&article.content_hash)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Returns `true` if an article with this fingerprint is already stored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn article_exists_by_hash(pool: &PgPool, content_hash: &str) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM articles WHERE content_hash = $1)",
    )
    .bind(content_hash)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Fetches one article by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no article has the given id, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_article(pool: &PgPool, id: Uuid) -> Result<ArticleRow, DbError> {
    let row = sqlx::query_as::<_, ArticleRow>(
        "SELECT id, source_id, external_id, title, url, content, summary, author, \
                published_at, categories, metadata, fetched_at, content_hash \
         FROM articles \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Up to `limit` articles with no enrichment for `persona_id`, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_unenriched_articles(
    pool: &PgPool,
    persona_id: Uuid,
    limit: i64,
) -> Result<Vec<UnenrichedArticleRow>, DbError> {
    let rows = sqlx::query_as::<_, UnenrichedArticleRow>(
        "SELECT a.id, a.title, a.content, a.published_at, s.name AS source_name \
         FROM articles a \
         JOIN sources s ON s.id = a.source_id \
         WHERE NOT EXISTS ( \
             SELECT 1 FROM enrichments e \
             WHERE e.article_id = a.id AND e.persona_id = $1 \
         ) \
         ORDER BY a.published_at DESC, a.id \
         LIMIT $2",
    )
    .bind(persona_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Page through articles newest first, each with its latest enrichment.
///
/// `search` filters on title, case-insensitively. When `persona_id` is set
/// only that persona's enrichments are joined.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_articles_with_enrichment(
    pool: &PgPool,
    persona_id: Option<Uuid>,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<ArticleFeedRow>, DbError> {
    let pattern = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(like_pattern);

    let rows = sqlx::query_as::<_, ArticleFeedRow>(
        "SELECT a.id, s.name AS source_name, s.category AS source_category, a.title, a.url, \
                a.summary, a.author, a.published_at, a.categories, \
                e.executive_summary, e.relevance_score, e.impact_level, e.sentiment, \
                e.category_tags \
         FROM articles a \
         JOIN sources s ON s.id = a.source_id \
         LEFT JOIN LATERAL ( \
             SELECT executive_summary, relevance_score, impact_level, sentiment, category_tags \
             FROM enrichments \
             WHERE article_id = a.id AND ($1::uuid IS NULL OR persona_id = $1) \
             ORDER BY enriched_at DESC \
             LIMIT 1 \
         ) e ON true \
         WHERE ($2::text IS NULL OR a.title ILIKE $2) \
         ORDER BY a.published_at DESC, a.id \
         LIMIT $3 OFFSET $4",
    )
    .bind(persona_id)
    .bind(pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Up to `limit` articles whose title contains `topic`, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn search_articles_by_title(
    pool: &PgPool,
    topic: &str,
    persona_id: Option<Uuid>,
    limit: i64,
) -> Result<Vec<TopicArticleRow>, DbError> {
    let rows = sqlx::query_as::<_, TopicArticleRow>(
        "SELECT a.id, a.title, s.name AS source_name, a.content, a.summary, \
                e.executive_summary, a.published_at \
         FROM articles a \
         JOIN sources s ON s.id = a.source_id \
         LEFT JOIN LATERAL ( \
             SELECT executive_summary FROM enrichments \
             WHERE article_id = a.id AND ($2::uuid IS NULL OR persona_id = $2) \
             ORDER BY enriched_at DESC \
             LIMIT 1 \
         ) e ON true \
         WHERE a.title ILIKE $1 \
         ORDER BY a.published_at DESC, a.id \
         LIMIT $3",
    )
    .bind(like_pattern(topic))
    .bind(persona_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
