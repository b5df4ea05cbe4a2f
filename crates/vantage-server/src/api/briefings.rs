use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vantage_db::BriefingRow;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct BriefingsQuery {
    pub limit: Option<i64>,
    pub persona_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub(super) struct BriefingItem {
    id: Uuid,
    persona_id: Uuid,
    content: String,
    article_ids: Vec<Uuid>,
    generated_at: DateTime<Utc>,
    model_used: String,
    token_count: i32,
}

impl From<BriefingRow> for BriefingItem {
    fn from(row: BriefingRow) -> Self {
        Self {
            id: row.id,
            persona_id: row.persona_id,
            content: row.content,
            article_ids: row.article_ids,
            generated_at: row.generated_at,
            model_used: row.model_used,
            token_count: row.token_count,
        }
    }
}

pub(super) async fn list_briefings(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<BriefingsQuery>,
) -> Result<Json<ApiResponse<Vec<BriefingItem>>>, ApiError> {
    let rows = vantage_db::list_briefings(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(
        rows.into_iter().map(BriefingItem::from).collect(),
        req_id.0,
    ))
}

pub(super) async fn latest_briefing(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<BriefingsQuery>,
) -> Result<Json<ApiResponse<BriefingItem>>, ApiError> {
    let row = vantage_db::get_latest_briefing(&state.pool, query.persona_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "no briefing generated yet"))?;

    Ok(ApiResponse::new(BriefingItem::from(row), req_id.0))
}
