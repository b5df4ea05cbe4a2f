use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vantage_db::{ArticleFeedRow, ConnectionRow};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct ArticlesQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub search: Option<String>,
    pub persona_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub(super) struct EnrichmentItem {
    executive_summary: String,
    relevance_score: Option<f64>,
    impact_level: Option<String>,
    sentiment: Option<String>,
    category_tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct ArticleItem {
    id: Uuid,
    source_name: String,
    source_category: String,
    title: String,
    url: String,
    summary: Option<String>,
    author: Option<String>,
    published_at: DateTime<Utc>,
    categories: Vec<String>,
    enrichment: Option<EnrichmentItem>,
}

impl From<ArticleFeedRow> for ArticleItem {
    fn from(row: ArticleFeedRow) -> Self {
        let enrichment = row.executive_summary.map(|executive_summary| EnrichmentItem {
            executive_summary,
            relevance_score: row.relevance_score,
            impact_level: row.impact_level,
            sentiment: row.sentiment,
            category_tags: row.category_tags.unwrap_or_default(),
        });

        Self {
            id: row.id,
            source_name: row.source_name,
            source_category: row.source_category,
            title: row.title,
            url: row.url,
            summary: row.summary,
            author: row.author,
            published_at: row.published_at,
            categories: row.categories,
            enrichment,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ConnectionItem {
    id: Uuid,
    source_article_id: Uuid,
    target_article_id: Uuid,
    relationship_type: String,
    reasoning: String,
    confidence: f64,
    created_at: DateTime<Utc>,
}

impl From<ConnectionRow> for ConnectionItem {
    fn from(row: ConnectionRow) -> Self {
        Self {
            id: row.id,
            source_article_id: row.source_article_id,
            target_article_id: row.target_article_id,
            relationship_type: row.relationship_type,
            reasoning: row.reasoning,
            confidence: row.confidence,
            created_at: row.created_at,
        }
    }
}

pub(super) async fn list_articles(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ArticlesQuery>,
) -> Result<Json<ApiResponse<Vec<ArticleItem>>>, ApiError> {
    let rows = vantage_db::list_articles_with_enrichment(
        &state.pool,
        query.persona_id,
        query.search.as_deref(),
        normalize_limit(query.limit),
        query.offset.unwrap_or(0).max(0),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(
        rows.into_iter().map(ArticleItem::from).collect(),
        req_id.0,
    ))
}

pub(super) async fn list_article_connections(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<ConnectionItem>>>, ApiError> {
    let rows = vantage_db::list_connections_for_article(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(
        rows.into_iter().map(ConnectionItem::from).collect(),
        req_id.0,
    ))
}
