use axum::{extract::State, Extension, Json};
use chrono::NaiveDate;
use serde::Serialize;
use vantage_pipeline::{daily_usage_summary, usage::today, PipelineUsage};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct UsageData {
    date: NaiveDate,
    usage: Vec<PipelineUsage>,
}

pub(super) async fn get_usage(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<UsageData>>, ApiError> {
    let date = today();
    let usage = daily_usage_summary(state.pipeline.store(), date)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(UsageData { date, usage }, req_id.0))
}
