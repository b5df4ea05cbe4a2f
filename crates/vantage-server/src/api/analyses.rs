use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vantage_core::AnalysisKind;
use vantage_db::AnalysisRow;
use vantage_pipeline::AnalysisRequest;

use crate::middleware::{trigger_kind, RequestId};

use super::pipeline::{admission_error, governed_response};
use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct CreateAnalysisBody {
    #[serde(default)]
    pub topic: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub persona_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AnalysesQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct AnalysisItem {
    id: Uuid,
    persona_id: Option<Uuid>,
    analysis_type: String,
    topic: String,
    title: String,
    content: String,
    article_ids: Vec<Uuid>,
    model_used: String,
    token_count: i32,
    created_at: DateTime<Utc>,
}

impl From<AnalysisRow> for AnalysisItem {
    fn from(row: AnalysisRow) -> Self {
        Self {
            id: row.id,
            persona_id: row.persona_id,
            analysis_type: row.analysis_type,
            topic: row.topic,
            title: row.title,
            content: row.content,
            article_ids: row.article_ids,
            model_used: row.model_used,
            token_count: row.token_count,
            created_at: row.created_at,
        }
    }
}

pub(super) async fn create_analysis(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Json(body): Json<CreateAnalysisBody>,
) -> Result<Response, ApiError> {
    let Ok(kind) = body.kind.parse::<AnalysisKind>() else {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "type must be one of competitive, trend, regulatory, threat",
        ));
    };
    let request = AnalysisRequest {
        topic: body.topic,
        kind,
        persona_id: body.persona_id,
    };
    let trigger = trigger_kind(&headers);

    let run = state
        .pipeline
        .run_governed_analysis(trigger, &request)
        .await
        .map_err(|e| admission_error(req_id.0.clone(), &e))?;

    Ok(governed_response(run, trigger))
}

pub(super) async fn list_analyses(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<AnalysesQuery>,
) -> Result<Json<ApiResponse<Vec<AnalysisItem>>>, ApiError> {
    let rows = vantage_db::list_analyses(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(
        rows.into_iter().map(AnalysisItem::from).collect(),
        req_id.0,
    ))
}

pub(super) async fn get_analysis(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AnalysisItem>>, ApiError> {
    let row = vantage_db::get_analysis(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(AnalysisItem::from(row), req_id.0))
}
