use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vantage_pipeline::usage::today;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct RunsQuery {
    /// Ledger day (UTC); defaults to today.
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub(super) struct PipelineRunItem {
    run_id: Uuid,
    pipeline: String,
    trigger: String,
    status: String,
    items_processed: i32,
    token_count: i64,
    error_message: Option<String>,
    run_date: NaiveDate,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

pub(super) async fn list_pipeline_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<ApiResponse<Vec<PipelineRunItem>>>, ApiError> {
    let date = query.date.unwrap_or_else(today);
    let rows = vantage_db::list_pipeline_runs_for_date(&state.pool, date)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| PipelineRunItem {
            run_id: row.id,
            pipeline: row.pipeline,
            trigger: row.trigger_kind,
            status: row.status,
            items_processed: row.items_processed,
            token_count: row.token_count,
            error_message: row.error_message,
            run_date: row.run_date,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
        .collect();

    Ok(ApiResponse::new(data, req_id.0))
}
